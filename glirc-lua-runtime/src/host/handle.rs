//! Per-call host handle
//!
//! `Host` pairs the host's entry point table with the live client pointer.
//! The embedding layer builds one for every incoming script call and passes
//! it explicitly; nothing in this crate caches a handle between calls.

use core::ffi::{c_char, c_int};
use core::ptr::{self, NonNull};

use super::abi::{Glirc, GlircApi, MessageCode, TimerCallback};
use crate::callbacks::Token;
use crate::error::{BindingError, Result, NO_SUCH_CHANNEL, NO_SUCH_NETWORK};
use crate::logging;
use crate::marshal::{ForeignString, ForeignStringArray, InjectRequest, Request};

/// Borrowed view of the host for the duration of one call
#[derive(Clone, Copy)]
pub struct Host<'h> {
    api: &'h GlircApi,
    glirc: NonNull<Glirc>,
}

impl core::fmt::Debug for Host<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Host").field("glirc", &self.glirc).finish_non_exhaustive()
    }
}

#[inline]
fn raw(bytes: &[u8]) -> (*const c_char, usize) {
    (bytes.as_ptr() as *const c_char, bytes.len())
}

#[inline]
fn raw_opt(bytes: Option<&[u8]>) -> (*const c_char, usize) {
    bytes.map_or((ptr::null(), 0), raw)
}

fn check_status(operation: &'static str, status: c_int) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        let err = BindingError::client_failure();
        logging::log_host_failure(operation, &err);
        Err(err)
    }
}

impl<'h> Host<'h> {
    /// Returns `None` for a null client pointer
    pub fn new(api: &'h GlircApi, glirc: *mut Glirc) -> Option<Self> {
        NonNull::new(glirc).map(|glirc| Self { api, glirc })
    }

    #[inline]
    pub fn api(&self) -> &'h GlircApi {
        self.api
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut Glirc {
        self.glirc.as_ptr()
    }

    /// Send a marshaled IRC command
    pub fn send_message(&self, request: &Request<'_>) -> Result<()> {
        logging::log_host_call("send_message", request.params_len());
        let message = request.as_raw();
        // `request` borrows every string referenced by `message` until return
        let status = unsafe { (self.api.send_message)(self.as_ptr(), &message) };
        check_status("send_message", status)
    }

    /// Add a line to a chat window as though `source` said it
    pub fn inject_chat(&self, request: &InjectRequest<'_>) -> Result<()> {
        logging::log_host_call("inject_chat", 4);
        let [net, src, tgt, msg] = request.as_raw();
        let status = unsafe {
            (self.api.inject_chat)(
                self.as_ptr(),
                net.str,
                net.len,
                src.str,
                src.len,
                tgt.str,
                tgt.len,
                msg.str,
                msg.len,
            )
        };
        check_status("inject_chat", status)
    }

    pub fn print(&self, code: MessageCode, message: &[u8]) {
        logging::log_host_call("print", 1);
        let (msg, msg_len) = raw(message);
        unsafe { (self.api.print)(self.as_ptr(), code, msg, msg_len) }
    }

    /// Names of connected networks. A null result is a client failure,
    /// never an empty list.
    pub fn list_networks(&self) -> Result<ForeignStringArray> {
        logging::log_host_call("list_networks", 0);
        let list = unsafe { (self.api.list_networks)(self.as_ptr()) };
        self.import_list("list_networks", list, BindingError::client_failure())
    }

    pub fn list_channels(&self, network: &[u8]) -> Result<ForeignStringArray> {
        logging::log_host_call("list_channels", 1);
        let (net, net_len) = raw(network);
        let list = unsafe { (self.api.list_channels)(self.as_ptr(), net, net_len) };
        self.import_list("list_channels", list, BindingError::NotFound(NO_SUCH_NETWORK))
    }

    pub fn list_channel_users(&self, network: &[u8], channel: &[u8]) -> Result<ForeignStringArray> {
        logging::log_host_call("list_channel_users", 2);
        let (net, net_len) = raw(network);
        let (chan, chan_len) = raw(channel);
        let list = unsafe {
            (self.api.list_channel_users)(self.as_ptr(), net, net_len, chan, chan_len)
        };
        self.import_list("list_channel_users", list, BindingError::NotFound(NO_SUCH_CHANNEL))
    }

    fn import_list(
        &self,
        operation: &'static str,
        list: *mut *mut c_char,
        on_null: BindingError,
    ) -> Result<ForeignStringArray> {
        match unsafe { ForeignStringArray::from_raw(list, self.api.free_strings) } {
            Some(array) => Ok(array),
            None => {
                logging::log_host_failure(operation, &on_null);
                Err(on_null)
            }
        }
    }

    /// Client's nickname on `network`, absent when not connected
    pub fn my_nick(&self, network: &[u8]) -> ForeignString {
        logging::log_host_call("my_nick", 1);
        let (net, net_len) = raw(network);
        let nick = unsafe { (self.api.my_nick)(self.as_ptr(), net, net_len) };
        unsafe { ForeignString::from_raw(nick, self.api.free_string) }
    }

    /// Services account for `nick`, absent when unknown
    pub fn user_account(&self, network: &[u8], nick: &[u8]) -> ForeignString {
        logging::log_host_call("user_account", 2);
        let (net, net_len) = raw(network);
        let (nick, nick_len) = raw(nick);
        let account = unsafe { (self.api.user_account)(self.as_ptr(), net, net_len, nick, nick_len) };
        unsafe { ForeignString::from_raw(account, self.api.free_string) }
    }

    /// Mode sigils for `nick` on `channel`, absent when not on the channel
    pub fn user_channel_modes(&self, network: &[u8], channel: &[u8], nick: &[u8]) -> ForeignString {
        logging::log_host_call("user_channel_modes", 3);
        let (net, net_len) = raw(network);
        let (chan, chan_len) = raw(channel);
        let (nick, nick_len) = raw(nick);
        let sigils = unsafe {
            (self.api.user_channel_modes)(
                self.as_ptr(),
                net,
                net_len,
                chan,
                chan_len,
                nick,
                nick_len,
            )
        };
        unsafe { ForeignString::from_raw(sigils, self.api.free_string) }
    }

    /// Resolve a path the same way the client configuration does
    pub fn resolve_path(&self, path: &[u8]) -> ForeignString {
        logging::log_host_call("resolve_path", 1);
        let (path, path_len) = raw(path);
        let resolved = unsafe { (self.api.resolve_path)(self.as_ptr(), path, path_len) };
        unsafe { ForeignString::from_raw(resolved, self.api.free_string) }
    }

    pub fn mark_seen(&self, network: Option<&[u8]>, channel: Option<&[u8]>) {
        logging::log_host_call("mark_seen", 2);
        let (net, net_len) = raw_opt(network);
        let (chan, chan_len) = raw_opt(channel);
        unsafe { (self.api.mark_seen)(self.as_ptr(), net, net_len, chan, chan_len) }
    }

    pub fn clear_window(&self, network: Option<&[u8]>, channel: Option<&[u8]>) {
        logging::log_host_call("clear_window", 2);
        let (net, net_len) = raw_opt(network);
        let (chan, chan_len) = raw_opt(channel);
        unsafe { (self.api.clear_window)(self.as_ptr(), net, net_len, chan, chan_len) }
    }

    /// Focused window as `(network, target)`. The client window is
    /// `(absent, absent)`, a network window `(network, absent)`.
    pub fn current_focus(&self) -> (ForeignString, ForeignString) {
        logging::log_host_call("current_focus", 0);
        let mut network: *mut c_char = ptr::null_mut();
        let mut target: *mut c_char = ptr::null_mut();
        let mut network_len = 0usize;
        let mut target_len = 0usize;
        unsafe {
            (self.api.current_focus)(
                self.as_ptr(),
                &mut network,
                &mut network_len,
                &mut target,
                &mut target_len,
            );
            (
                ForeignString::from_raw_parts(network, network_len, self.api.free_string),
                ForeignString::from_raw_parts(target, target_len, self.api.free_string),
            )
        }
    }

    pub fn is_logged_on(&self, network: &[u8], nick: &[u8]) -> bool {
        logging::log_host_call("is_logged_on", 2);
        let (net, net_len) = raw(network);
        let (nick, nick_len) = raw(nick);
        unsafe { (self.api.is_logged_on)(self.as_ptr(), net, net_len, nick, nick_len) != 0 }
    }

    pub fn is_channel(&self, network: &[u8], target: &[u8]) -> bool {
        logging::log_host_call("is_channel", 2);
        let (net, net_len) = raw(network);
        let (tgt, tgt_len) = raw(target);
        unsafe { (self.api.is_channel)(self.as_ptr(), net, net_len, tgt, tgt_len) != 0 }
    }

    /// Ask the host to call `callback` with `token` after `delay_ms`.
    /// Returns immediately.
    pub fn set_timer(&self, delay_ms: u64, callback: TimerCallback, token: Token) {
        logging::log_host_call("set_timer", 2);
        unsafe { (self.api.set_timer)(self.as_ptr(), delay_ms, callback, token.into_raw()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeHost, FAKE_API};

    #[test]
    fn test_null_client_rejected() {
        assert!(Host::new(&FAKE_API, ptr::null_mut()).is_none());
    }

    #[test]
    fn test_null_list_is_failure_not_empty() {
        let fake = FakeHost::new();
        fake.fail_network_list(true);
        let host = fake.host();

        assert_eq!(host.list_networks().unwrap_err(), BindingError::client_failure());
        assert_eq!(
            host.list_channels(b"nowhere").unwrap_err(),
            BindingError::NotFound(NO_SUCH_NETWORK)
        );
        assert_eq!(
            host.list_channel_users(b"nowhere", b"#x").unwrap_err(),
            BindingError::NotFound(NO_SUCH_CHANNEL)
        );
    }

    #[test]
    fn test_empty_list_is_not_failure() {
        let fake = FakeHost::new();
        let host = fake.host();

        let networks = host.list_networks().unwrap();
        assert!(networks.is_empty());
        drop(networks);
        assert_eq!(fake.ledger().outstanding(), 0);
    }

    #[test]
    fn test_current_focus_shapes() {
        let fake = FakeHost::new();
        let host = fake.host();

        let (net, tgt) = host.current_focus();
        assert_eq!((net.to_vec(), tgt.to_vec()), (None, None));

        fake.set_focus(Some("mynet"), None);
        let (net, tgt) = host.current_focus();
        assert_eq!((net.to_vec(), tgt.to_vec()), (Some(b"mynet".to_vec()), None));

        fake.set_focus(Some("mynet"), Some("#somechan"));
        let (net, tgt) = host.current_focus();
        assert_eq!(net.as_bytes(), Some(&b"mynet"[..]));
        assert_eq!(tgt.as_bytes(), Some(&b"#somechan"[..]));
        drop((net, tgt));

        let ledger = fake.ledger();
        assert_eq!(ledger.outstanding(), 0);
        assert_eq!(ledger.double_releases(), 0);
    }

    #[test]
    fn test_optional_window_arguments() {
        let fake = FakeHost::new();
        let host = fake.host();

        host.mark_seen(Some(b"mynet"), Some(b"#somechan"));
        host.mark_seen(Some(b"mynet"), None);
        host.clear_window(None, None);

        assert_eq!(
            fake.seen(),
            vec![
                (Some(b"mynet".to_vec()), Some(b"#somechan".to_vec())),
                (Some(b"mynet".to_vec()), None),
            ]
        );
        assert_eq!(fake.cleared(), vec![(None, None)]);
    }

    #[test]
    fn test_boolean_queries() {
        let fake = FakeHost::new();
        fake.add_network("mynet", Some("mynick"));
        fake.set_logged_on("mynet", "chatter");
        let host = fake.host();

        assert!(host.is_logged_on(b"mynet", b"chatter"));
        assert!(!host.is_logged_on(b"mynet", b"ghost"));
        assert!(host.is_channel(b"mynet", b"#somechan"));
        assert!(host.is_channel(b"mynet", b"&somechan"));
        assert!(!host.is_channel(b"mynet", b"chatter"));
    }
}
