//! Deletion contract: a fresh resource is created before every test.

use super::create::{clear_collection, create_and_locate};
use contract_harness::prelude::*;

pub fn suite() -> Suite {
    Suite::new("delete", "Delete Restaurant")
        .before_each(create_and_locate)
        .test("should return 204 NO CONTENT response", delete_returns_no_content)
        .test(
            "should return Not Found for the deleted restaurant",
            deleted_resource_is_gone,
        )
        .test("should return empty restaurants list", clearing_empties_collection)
        .after(clear_collection)
}

fn delete_returns_no_content(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        let reference = ctx.reference()?.clone();
        let deleted = ctx.client().remove(reference.as_str());
        expect_eventually(&deleted, Facet::Status).to_equal(204).await
    }
    .boxed()
}

fn deleted_resource_is_gone(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        let reference = ctx.reference()?.clone();
        ctx.client().remove(reference.as_str()).settle().await?;
        let read = ctx.client().read(reference.as_str());
        expect_rejection(&read)
            .with_reason_containing("Not Found")
            .await
    }
    .boxed()
}

fn clearing_empties_collection(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        ctx.client().remove(ctx.collection_url()).settle().await?;
        let listing = ctx.client().read(ctx.collection_url());
        expect_eventually(&listing, Facet::Body)
            .to_have_length(0)
            .await
    }
    .boxed()
}
