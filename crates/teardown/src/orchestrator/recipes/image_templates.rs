use crate::orchestrator::context::RemovalContext;
use crate::orchestrator::error::RemovalError;
use crate::orchestrator::registry::Recipe;
use crate::orchestrator::report::RemovalOutcome;
use crate::wait::{Poll, PollOutcome};
use async_trait::async_trait;

/// Image builder templates delete asynchronously. The template keeps
/// answering 200 until it is gone; a 400 means the delete failed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageTemplateRecipe;

#[async_trait]
impl Recipe for ImageTemplateRecipe {
    fn name(&self) -> &'static str {
        "image-template"
    }

    async fn remove_step(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        if !ctx.proceed(format!("delete image template '{}'", ctx.target.id))? {
            return Ok(());
        }
        let response = ctx
            .service
            .request_image_template_deletion(&ctx.target.id)
            .await
            .map_err(ctx.target.fail("delete image template"))?;
        if response.is_not_found() {
            ctx.set_outcome(RemovalOutcome::AlreadyAbsent);
        } else if !response.is_success() {
            let error = response.error(ctx.target.id.as_str());
            return Err(ctx.target.fail("delete image template")(error));
        }
        Ok(())
    }

    async fn post_wait(&self, ctx: &mut RemovalContext<'_>) -> Result<(), RemovalError> {
        if ctx.already_absent() {
            return Ok(());
        }

        let service = ctx.service;
        let snapshot = ctx.target.clone();
        let target = &snapshot;
        let policy = ctx.options.poll;
        let outcome = ctx
            .poll(&policy, "image template deleted", |_| async move {
                let response = service
                    .probe_image_template(&target.id)
                    .await
                    .map_err(target.fail("wait for image template deletion"))?;
                match response.status {
                    404 => Ok(Poll::Ready),
                    200..=299 => Ok(Poll::Pending),
                    _ => Err(target.fail("wait for image template deletion")(
                        response.error(target.id.as_str()),
                    )),
                }
            })
            .await?;

        if let PollOutcome::Exhausted { attempts } = outcome {
            ctx.warn(format!(
                "image template still present after {} checks, continuing",
                attempts
            ));
        }
        Ok(())
    }
}
