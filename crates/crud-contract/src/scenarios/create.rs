//! Creation contract: 201 on POST, record readable afterwards.

use contract_harness::prelude::*;

const CREATED: &str = "created";

pub fn suite() -> Suite {
    Suite::new("create", "Create Restaurant")
        .before(clear_then_create)
        .test("should return a 201 CREATED response", returns_created)
        .test(
            "should have restaurant_name property equal to 'Hudson'",
            lists_created_record,
        )
        .test("should store every fixture field", stores_fixture_fields)
        .test(
            "should return the same record on consecutive reads",
            reads_are_stable,
        )
        .after(clear_collection)
}

fn clear_then_create(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        ctx.client().remove(ctx.collection_url()).settle().await?;
        let created = ctx
            .client()
            .create(ctx.collection_url(), &NewRestaurant::hudson());
        ctx.store(CREATED, created);
        Ok(())
    }
    .boxed()
}

/// Empty the collection, create the fixture, then locate it. Each step waits for the last.
pub(crate) fn create_and_locate(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        ctx.client().remove(ctx.collection_url()).settle().await?;
        let created = ctx
            .client()
            .create(ctx.collection_url(), &NewRestaurant::hudson());
        ctx.locate(&created).await?;
        Ok(())
    }
    .boxed()
}

pub(crate) fn clear_collection(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        ctx.client().remove(ctx.collection_url()).settle().await?;
        Ok(())
    }
    .boxed()
}

fn returns_created(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        let created = ctx.pending(CREATED)?;
        expect_eventually(&created, Facet::Status).to_equal(201).await
    }
    .boxed()
}

fn lists_created_record(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        ctx.pending(CREATED)?.settle().await?;
        let listing = ctx.client().read(ctx.collection_url());
        expect_eventually(&listing, Facet::Body)
            .at("/0")
            .to_have_property("restaurant_name", "Hudson")
            .await
    }
    .boxed()
}

fn stores_fixture_fields(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        let created = ctx.pending(CREATED)?;
        let reference = ctx.locate(&created).await?;
        let record = ctx.client().read(reference.as_str());
        expect_eventually(&record, Facet::Body)
            .to_include(&NewRestaurant::hudson())
            .await
    }
    .boxed()
}

fn reads_are_stable(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        let created = ctx.pending(CREATED)?;
        let reference = ctx.locate(&created).await?;

        let first = ctx.client().read(reference.as_str()).settle().await?;
        let Some(record) = first.body.clone() else {
            return Err(TestError::Mismatch {
                subject: "body".to_string(),
                expectation: "to be present".to_string(),
                actual: format!("an empty {} response", first.status),
            });
        };
        let second = ctx.client().read(reference.as_str());

        expect_eventually(&second, Facet::Body)
            .to_equal(record)
            .await
    }
    .boxed()
}
