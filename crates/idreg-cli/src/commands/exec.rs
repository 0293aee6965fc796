/*!
 * Single command execution
 */

use anyhow::Result;
use idreg_core::IdentityRegistry;

use super::render::render_response;

pub async fn exec<R: IdentityRegistry>(registry: &R, sender: &str, command: &str) -> Result<()> {
    tracing::debug!(sender = %sender, "Handling command");

    let response = registry.handle(command, sender).await?;
    println!("{}", render_response(&response));

    Ok(())
}
