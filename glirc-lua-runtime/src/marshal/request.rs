//! Request marshaling - script strings packed into the host message shape
//!
//! Requests borrow the caller's bytes; nothing is copied. The lifetime `'a`
//! keeps every referenced string alive and unmodified until the request is
//! dropped, which for the host call is after the call returns.

use core::marker::PhantomData;

use smallvec::SmallVec;

use crate::error::{BindingError, Result};
use crate::host::{GlircMessage, GlircString, Host};

/// Hard protocol ceiling on command parameters
pub const MAX_PARAMS: usize = 15;

/// Reject parameter counts above `MAX_PARAMS` before anything is built
#[inline]
pub fn check_param_count(count: usize) -> Result<()> {
    if count > MAX_PARAMS {
        Err(BindingError::too_many_parameters())
    } else {
        Ok(())
    }
}

/// Outgoing command borrowing its network, command and parameters
pub struct Request<'a> {
    network: GlircString,
    command: GlircString,
    params: SmallVec<[GlircString; MAX_PARAMS]>,
    _borrow: PhantomData<&'a [u8]>,
}

impl<'a> Request<'a> {
    pub fn new(network: &'a [u8], command: &'a [u8], params: &[&'a [u8]]) -> Result<Self> {
        check_param_count(params.len())?;

        // Count is validated, so this never spills to the heap
        let params = params.iter().map(|p| GlircString::from_bytes(p)).collect();

        Ok(Self {
            network: GlircString::from_bytes(network),
            command: GlircString::from_bytes(command),
            params,
            _borrow: PhantomData,
        })
    }

    #[inline]
    pub fn params_len(&self) -> usize {
        self.params.len()
    }

    /// Host view of the request, valid while `self` is
    pub fn as_raw(&self) -> GlircMessage {
        GlircMessage {
            network: self.network,
            command: self.command,
            params: self.params.as_ptr(),
            params_n: self.params.len(),
        }
    }
}

/// Synthetic chat line: network, source, target, message body
pub struct InjectRequest<'a> {
    fields: [GlircString; 4],
    _borrow: PhantomData<&'a [u8]>,
}

impl<'a> InjectRequest<'a> {
    pub fn new(network: &'a [u8], source: &'a [u8], target: &'a [u8], message: &'a [u8]) -> Self {
        Self {
            fields: [
                GlircString::from_bytes(network),
                GlircString::from_bytes(source),
                GlircString::from_bytes(target),
                GlircString::from_bytes(message),
            ],
            _borrow: PhantomData,
        }
    }

    #[inline]
    pub fn as_raw(&self) -> [GlircString; 4] {
        self.fields
    }
}

/// Marshal and send an IRC command. No host call happens when the
/// parameter count is out of range.
pub fn send_message(host: &Host<'_>, network: &[u8], command: &[u8], params: &[&[u8]]) -> Result<()> {
    let request = Request::new(network, command, params)?;
    host.send_message(&request)
}

/// Marshal and inject a chat line
pub fn inject_chat(
    host: &Host<'_>,
    network: &[u8],
    source: &[u8],
    target: &[u8],
    message: &[u8],
) -> Result<()> {
    let request = InjectRequest::new(network, source, target, message);
    host.inject_chat(&request)
}
