use std::io::Write as _;

use anyhow::Context as _;

use crate::browse::{SYNC_GRACE, open_session};
use crate::cli::SessionArgs;

pub async fn run(args: SessionArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args).await?;
    let pick_list = session.pick_list();

    let mut out = std::io::stdout().lock();
    if !pick_list.is_empty() {
        writeln!(out, "{pick_list}").context("write pick-list")?;
    }
    out.flush().context("flush pick-list")?;
    drop(out);

    session.finish_background_sync(SYNC_GRACE).await;
    Ok(())
}
