//! `vayu pause` / `vayu resume` / `vayu cancel` – signal a running `vayu copy`.

use anyhow::Result;

use crate::cli::control_socket::{self, ControlCommand};

pub async fn run_control(cmd: ControlCommand) -> Result<()> {
    let path = vayu_core::control::default_control_socket_path()?;
    if control_socket::send_command(&path, cmd).await? {
        println!("Sent {} to running copy", cmd.as_str());
    } else {
        println!("No copy in progress.");
    }
    Ok(())
}
