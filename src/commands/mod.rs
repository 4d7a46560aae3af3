pub mod redlist;
pub mod submit;

use crate::{Context, Error};

/// Reply visible only to the invoking user.
pub(crate) async fn say_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
