//! Cross-origin preflight contract.

use contract_harness::prelude::*;

const PREFLIGHT: &str = "preflight";

/// Headers every preflight response must carry.
pub const REQUIRED_CORS_HEADERS: [&str; 3] = [
    "access-control-allow-origin",
    "access-control-allow-methods",
    "access-control-allow-headers",
];

pub fn suite() -> Suite {
    Suite::new("cors", "Cross Origin Requests")
        .before(send_preflight)
        .test("should return the correct CORS headers", returns_cors_headers)
        .test("should allow all origins", allows_all_origins)
}

fn send_preflight(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        let pending = ctx.client().preflight(ctx.collection_url());
        ctx.store(PREFLIGHT, pending);
        Ok(())
    }
    .boxed()
}

fn returns_cors_headers(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        let preflight = ctx.pending(PREFLIGHT)?;
        expect_eventually(&preflight, Facet::Headers)
            .to_contain_keys(REQUIRED_CORS_HEADERS)
            .await
    }
    .boxed()
}

fn allows_all_origins(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
    async move {
        let preflight = ctx.pending(PREFLIGHT)?;
        expect_eventually(&preflight, Facet::Headers)
            .to_have_property("access-control-allow-origin", "*")
            .await
    }
    .boxed()
}
