//! Local TCP port allocation.

use std::net::{Ipv4Addr, TcpListener};

/// Return a free local TCP port by briefly binding to port 0.
///
/// The listener is dropped before returning, so another process may grab the
/// port in between; callers bind it again right away.
pub fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}
