use std::collections::VecDeque;
use std::io::{self, Write};

use anyhow::{Result, bail};
use ipapi_lib::{ErrorKind, LookupHandle};
use log::debug;

use super::CommandParams;
use crate::ExitCode;
use crate::formatters::result::ResultFormatter;

/// Look up all addresses and write one line per result to `out`,
/// in the order the addresses were given.
///
/// The queue of the geolocator is used for back-pressure: whenever it is
/// full, the oldest outstanding lookup is awaited before submitting more.
pub(crate) async fn lookup<W: Write>(params: CommandParams, out: &mut W) -> Result<ExitCode> {
    let CommandParams {
        geolocator,
        addresses,
        formatter,
    } = params;

    let mut outstanding: VecDeque<LookupHandle> = VecDeque::new();
    let mut any_failed = false;

    for address in addresses {
        loop {
            match geolocator.submit(address.as_str()) {
                Ok(handle) => {
                    outstanding.push_back(handle);
                    break;
                }
                Err(ErrorKind::QueueFull { capacity }) => {
                    let Some(oldest) = outstanding.pop_front() else {
                        bail!("Cannot submit lookups to a queue with capacity {capacity}");
                    };
                    debug!("Queue full, waiting for {:?}", oldest.address());
                    any_failed |= write_result(oldest, formatter.as_ref(), out).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    while let Some(handle) = outstanding.pop_front() {
        any_failed |= write_result(handle, formatter.as_ref(), out).await?;
    }

    if any_failed {
        Ok(ExitCode::LookupFailure)
    } else {
        Ok(ExitCode::Success)
    }
}

/// Wait for a lookup and write its result.
/// Returns whether the lookup failed.
async fn write_result<W: Write>(
    handle: LookupHandle,
    formatter: &dyn ResultFormatter,
    out: &mut W,
) -> Result<bool> {
    let result = handle.await?;
    let line = formatter.format(&result)?;

    // Avoid panic on broken pipe.
    // See https://github.com/rust-lang/rust/issues/46016
    // This can occur when piping the output of ipapi
    // to another program like `head`.
    if let Err(e) = writeln!(out, "{line}")
        && e.kind() != io::ErrorKind::BrokenPipe
    {
        return Err(e.into());
    }
    Ok(result.is_fail())
}
