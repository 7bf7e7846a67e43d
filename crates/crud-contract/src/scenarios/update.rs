//! Update contract: PUT and PATCH on one resource created once for the suite.

use super::create::{clear_collection, create_and_locate};
use contract_harness::fixtures::{field_update, PATCH_FIELD, PUT_FIELD};
use contract_harness::prelude::*;
use serde_json::Value;

pub fn suite() -> Suite {
    Suite::new("update", "Update Restaurant")
        .before(create_and_locate)
        .test(
            "should have restaurant_type set to Burger after PUT update",
            put_replaces_field,
        )
        .test(
            "should persist restaurant_type set to Burger after PUT update",
            put_is_persisted,
        )
        .test(
            "should have phone set to (+972) 050 - 4945555 PATCH update",
            patch_updates_field,
        )
        .test(
            "should persist phone set to (+972) 050 - 4945555 after PATCH update",
            patch_is_persisted,
        )
        .test(
            "should leave other fields unchanged after PATCH update",
            patch_keeps_other_fields,
        )
        .after(clear_collection)
}

fn put_replaces_field(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move { update_responds_with(ctx, Update::Put, PUT_FIELD).await }.boxed()
}

fn put_is_persisted(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move { update_is_read_back(ctx, Update::Put, PUT_FIELD).await }.boxed()
}

fn patch_updates_field(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move { update_responds_with(ctx, Update::Patch, PATCH_FIELD).await }.boxed()
}

fn patch_is_persisted(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move { update_is_read_back(ctx, Update::Patch, PATCH_FIELD).await }.boxed()
}

/// The update's own response carries the new value.
async fn update_responds_with(ctx: &mut Context, update: Update, change: (&str, &str)) -> StepResult {
    let reference = ctx.reference()?.clone();
    let (field, value) = change;
    let updated = ctx
        .client()
        .mutate(reference.as_str(), update, &field_update(change));
    expect_eventually(&updated, Facet::Body)
        .to_have_property(field, value)
        .await
}

/// The read following the update sees the new value.
async fn update_is_read_back(ctx: &mut Context, update: Update, change: (&str, &str)) -> StepResult {
    let reference = ctx.reference()?.clone();
    let (field, value) = change;
    ctx.client()
        .mutate(reference.as_str(), update, &field_update(change))
        .settle()
        .await?;

    let record = ctx.client().read(reference.as_str());
    expect_eventually(&record, Facet::Body)
        .to_have_property(field, value)
        .await
}

/// Works on a fresh record so earlier updates in the suite cannot mask the result.
fn patch_keeps_other_fields(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        create_and_locate(ctx).await?;
        let reference = ctx.reference()?.clone();
        let change = (PATCH_FIELD.0, "(+972) 000 - 0000000");

        let before = ctx.client().read(reference.as_str()).settle().await?;
        let mut expected = match before.body.clone() {
            Some(Value::Object(fields)) => fields,
            other => {
                return Err(TestError::Mismatch {
                    subject: "body".to_string(),
                    expectation: "to be an object".to_string(),
                    actual: other.map_or_else(|| "<absent>".to_string(), |v| v.to_string()),
                })
            }
        };
        expected.insert(change.0.to_string(), Value::String(change.1.to_string()));

        ctx.client()
            .mutate(reference.as_str(), Update::Patch, &field_update(change))
            .settle()
            .await?;

        let after = ctx.client().read(reference.as_str());
        expect_eventually(&after, Facet::Body)
            .to_include(&Value::Object(expected))
            .await
    }
    .boxed()
}
