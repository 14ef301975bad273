//! Instrumented in-process host for tests
//!
//! `FakeHost` implements the whole `GlircApi` table with real heap strings.
//! Every string and array it hands out is recorded in a `Ledger`, and every
//! release is counted per allocation. Allocations are intentionally never
//! reclaimed, so addresses stay unique and a second release of the same
//! pointer is observable instead of undefined.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ffi::CString;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use core::ffi::{c_char, c_int, c_void};
use core::ptr;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::host::{Glirc, GlircApi, GlircMessage, Host, MessageCode, TimerCallback};
use crate::identifier::identifier_cmp;

/// Allocation address → owning ledger, so `free_*` can find its host
static OWNERS: Lazy<Mutex<HashMap<usize, Arc<Ledger>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Releases of pointers no fake host ever handed out
static UNTRACKED_RELEASES: AtomicUsize = AtomicUsize::new(0);

pub fn untracked_releases() -> usize {
    UNTRACKED_RELEASES.load(AtomicOrdering::SeqCst)
}

/// Per-host allocation and release accounting
#[derive(Debug, Default)]
pub struct Ledger {
    releases: Mutex<HashMap<usize, usize>>,
}

impl Ledger {
    fn track(self: &Arc<Self>, addr: usize) {
        self.releases.lock().insert(addr, 0);
        OWNERS.lock().insert(addr, Arc::clone(self));
    }

    fn record_release(&self, addr: usize) {
        *self.releases.lock().entry(addr).or_insert(0) += 1;
    }

    /// Strings and arrays handed out so far
    pub fn allocations(&self) -> usize {
        self.releases.lock().len()
    }

    /// Total release calls observed
    pub fn releases(&self) -> usize {
        self.releases.lock().values().sum()
    }

    /// Allocations not yet released
    pub fn outstanding(&self) -> usize {
        self.releases.lock().values().filter(|&&n| n == 0).count()
    }

    /// Allocations released more than once
    pub fn double_releases(&self) -> usize {
        self.releases.lock().values().filter(|&&n| n > 1).count()
    }
}

fn release(addr: usize) {
    let owner = OWNERS.lock().get(&addr).cloned();
    match owner {
        Some(ledger) => ledger.record_release(addr),
        None => {
            UNTRACKED_RELEASES.fetch_add(1, AtomicOrdering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub network: Vec<u8>,
    pub command: Vec<u8>,
    pub params: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedLine {
    pub network: Vec<u8>,
    pub source: Vec<u8>,
    pub target: Vec<u8>,
    pub message: Vec<u8>,
}

pub type WindowArgs = (Option<Vec<u8>>, Option<Vec<u8>>);

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    delay_ms: u64,
    callback: TimerCallback,
    token: usize,
}

#[derive(Debug, Default)]
struct FakeChannel {
    name: Vec<u8>,
    users: Vec<(Vec<u8>, Vec<u8>)>,
}

#[derive(Debug, Default)]
struct FakeNetwork {
    name: Vec<u8>,
    nick: Option<Vec<u8>>,
    channels: Vec<FakeChannel>,
    accounts: Vec<(Vec<u8>, Vec<u8>)>,
    logged_on: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
struct FakeState {
    networks: Vec<FakeNetwork>,
    focus: (Option<Vec<u8>>, Option<Vec<u8>>),
    fail_sends: bool,
    fail_network_list: bool,
    send_attempts: usize,
    sent: Vec<SentMessage>,
    injected: Vec<InjectedLine>,
    printed: Vec<(MessageCode, Vec<u8>)>,
    seen: Vec<WindowArgs>,
    cleared: Vec<WindowArgs>,
    timers: Vec<PendingTimer>,
    last_fired: Option<PendingTimer>,
}

fn same_id(a: &[u8], b: &[u8]) -> bool {
    identifier_cmp(a, b) == Ordering::Equal
}

impl FakeState {
    fn network(&self, name: &[u8]) -> Option<&FakeNetwork> {
        self.networks.iter().find(|n| n.name == name)
    }

    fn network_mut(&mut self, name: &[u8]) -> Option<&mut FakeNetwork> {
        self.networks.iter_mut().find(|n| n.name == name)
    }

    fn channel(&self, network: &[u8], channel: &[u8]) -> Option<&FakeChannel> {
        self.network(network)?
            .channels
            .iter()
            .find(|c| same_id(&c.name, channel))
    }
}

/// In-process host with observable side effects
#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<FakeState>,
    ledger: Arc<Ledger>,
}

impl FakeHost {
    /// Boxed so the client pointer handed to the core stays put
    pub fn new() -> Box<Self> {
        Box::default()
    }

    pub fn as_glirc(&self) -> *mut Glirc {
        self as *const Self as *mut Glirc
    }

    /// Handle over this host. Must not be used after `self` is dropped.
    pub fn host(&self) -> Host<'static> {
        Host::new(&FAKE_API, self.as_glirc()).expect("fake host pointer is never null")
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }

    // ------------------------------------------------------------------
    // Scenario setup
    // ------------------------------------------------------------------

    pub fn add_network(&self, name: &str, nick: Option<&str>) {
        self.state.lock().networks.push(FakeNetwork {
            name: name.as_bytes().to_vec(),
            nick: nick.map(|n| n.as_bytes().to_vec()),
            ..FakeNetwork::default()
        });
    }

    /// Add a joined channel with `(nick, sigils)` members
    pub fn add_channel(&self, network: &str, channel: &str, users: &[(&str, &str)]) {
        let mut state = self.state.lock();
        let net = state
            .network_mut(network.as_bytes())
            .expect("add_network before add_channel");
        net.channels.push(FakeChannel {
            name: channel.as_bytes().to_vec(),
            users: users
                .iter()
                .map(|(nick, sigils)| (nick.as_bytes().to_vec(), sigils.as_bytes().to_vec()))
                .collect(),
        });
    }

    pub fn set_account(&self, network: &str, nick: &str, account: &str) {
        let mut state = self.state.lock();
        let net = state
            .network_mut(network.as_bytes())
            .expect("add_network before set_account");
        net.accounts
            .push((nick.as_bytes().to_vec(), account.as_bytes().to_vec()));
    }

    pub fn set_logged_on(&self, network: &str, nick: &str) {
        let mut state = self.state.lock();
        let net = state
            .network_mut(network.as_bytes())
            .expect("add_network before set_logged_on");
        net.logged_on.push(nick.as_bytes().to_vec());
    }

    pub fn set_focus(&self, network: Option<&str>, target: Option<&str>) {
        self.state.lock().focus = (
            network.map(|s| s.as_bytes().to_vec()),
            target.map(|s| s.as_bytes().to_vec()),
        );
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    pub fn fail_network_list(&self, fail: bool) {
        self.state.lock().fail_network_list = fail;
    }

    // ------------------------------------------------------------------
    // Observations
    // ------------------------------------------------------------------

    /// Every `send_message` call, including rejected ones
    pub fn send_attempts(&self) -> usize {
        self.state.lock().send_attempts
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    pub fn injected(&self) -> Vec<InjectedLine> {
        self.state.lock().injected.clone()
    }

    pub fn printed(&self) -> Vec<(MessageCode, Vec<u8>)> {
        self.state.lock().printed.clone()
    }

    /// Messages printed with `MessageCode::Error`, lossily decoded
    pub fn errors(&self) -> Vec<String> {
        self.state
            .lock()
            .printed
            .iter()
            .filter(|(code, _)| *code == MessageCode::Error)
            .map(|(_, msg)| String::from_utf8_lossy(msg).into_owned())
            .collect()
    }

    pub fn seen(&self) -> Vec<WindowArgs> {
        self.state.lock().seen.clone()
    }

    pub fn cleared(&self) -> Vec<WindowArgs> {
        self.state.lock().cleared.clone()
    }

    /// Delays of timers scheduled but not yet fired
    pub fn pending_timers(&self) -> Vec<u64> {
        self.state.lock().timers.iter().map(|t| t.delay_ms).collect()
    }

    // ------------------------------------------------------------------
    // Timer delivery
    // ------------------------------------------------------------------

    /// Deliver every pending timer with `state` as the extension state.
    /// Timers scheduled by the callbacks themselves stay pending.
    pub fn fire_timers(&self, state: *mut c_void) -> usize {
        self.fire_timers_with(self.as_glirc(), state)
    }

    /// Deliver every due timer passing `glirc` as the client, as a host
    /// that hands callbacks a different (or null) client handle would
    pub fn fire_timers_with(&self, glirc: *mut Glirc, state: *mut c_void) -> usize {
        let due = std::mem::take(&mut self.state.lock().timers);
        for timer in &due {
            self.state.lock().last_fired = Some(*timer);
            unsafe { (timer.callback)(glirc, state, timer.token as *mut c_void) };
        }
        due.len()
    }

    /// Deliver the most recently fired timer again, as a faulty host would
    pub fn refire_last(&self, state: *mut c_void) -> bool {
        let last = self.state.lock().last_fired;
        match last {
            Some(timer) => {
                unsafe { (timer.callback)(self.as_glirc(), state, timer.token as *mut c_void) };
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Allocation helpers
    // ------------------------------------------------------------------

    fn alloc_string(&self, bytes: &[u8]) -> *mut c_char {
        let owned = CString::new(bytes).expect("fake host strings contain no NUL");
        let ptr = owned.into_raw();
        self.ledger.track(ptr as usize);
        ptr
    }

    fn alloc_optional(&self, bytes: Option<&[u8]>) -> *mut c_char {
        bytes.map_or(ptr::null_mut(), |b| self.alloc_string(b))
    }

    fn alloc_array<'a>(&self, entries: impl IntoIterator<Item = &'a [u8]>) -> *mut *mut c_char {
        let mut list: Vec<*mut c_char> = entries.into_iter().map(|e| self.alloc_string(e)).collect();
        list.push(ptr::null_mut());
        let ptr = Box::into_raw(list.into_boxed_slice()) as *mut *mut c_char;
        self.ledger.track(ptr as usize);
        ptr
    }
}

unsafe fn fake<'a>(glirc: *mut Glirc) -> &'a FakeHost {
    &*(glirc as *const FakeHost)
}

unsafe fn bytes<'a>(ptr: *const c_char, len: usize) -> Option<&'a [u8]> {
    if ptr.is_null() {
        None
    } else {
        Some(core::slice::from_raw_parts(ptr as *const u8, len))
    }
}

unsafe fn owned(ptr: *const c_char, len: usize) -> Vec<u8> {
    bytes(ptr, len).unwrap_or_default().to_vec()
}

unsafe extern "C" fn fake_send_message(glirc: *mut Glirc, msg: *const GlircMessage) -> c_int {
    let host = fake(glirc);
    let msg = &*msg;
    let params = if msg.params_n == 0 {
        Vec::new()
    } else {
        core::slice::from_raw_parts(msg.params, msg.params_n)
            .iter()
            .map(|p| owned(p.str, p.len))
            .collect()
    };
    let sent = SentMessage {
        network: owned(msg.network.str, msg.network.len),
        command: owned(msg.command.str, msg.command.len),
        params,
    };

    let mut state = host.state.lock();
    state.send_attempts += 1;
    if state.fail_sends || state.network(&sent.network).is_none() {
        return 1;
    }
    state.sent.push(sent);
    0
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn fake_inject_chat(
    glirc: *mut Glirc,
    net: *const c_char,
    net_len: usize,
    src: *const c_char,
    src_len: usize,
    tgt: *const c_char,
    tgt_len: usize,
    msg: *const c_char,
    msg_len: usize,
) -> c_int {
    let host = fake(glirc);
    let line = InjectedLine {
        network: owned(net, net_len),
        source: owned(src, src_len),
        target: owned(tgt, tgt_len),
        message: owned(msg, msg_len),
    };
    let mut state = host.state.lock();
    if state.network(&line.network).is_none() {
        return 1;
    }
    state.injected.push(line);
    0
}

unsafe extern "C" fn fake_print(glirc: *mut Glirc, code: MessageCode, msg: *const c_char, len: usize) {
    fake(glirc).state.lock().printed.push((code, owned(msg, len)));
}

unsafe extern "C" fn fake_list_networks(glirc: *mut Glirc) -> *mut *mut c_char {
    let host = fake(glirc);
    let state = host.state.lock();
    if state.fail_network_list {
        return ptr::null_mut();
    }
    host.alloc_array(state.networks.iter().map(|n| n.name.as_slice()))
}

unsafe extern "C" fn fake_list_channels(glirc: *mut Glirc, net: *const c_char, net_len: usize) -> *mut *mut c_char {
    let host = fake(glirc);
    let state = host.state.lock();
    match state.network(bytes(net, net_len).unwrap_or_default()) {
        Some(network) => host.alloc_array(network.channels.iter().map(|c| c.name.as_slice())),
        None => ptr::null_mut(),
    }
}

unsafe extern "C" fn fake_list_channel_users(
    glirc: *mut Glirc,
    net: *const c_char,
    net_len: usize,
    chan: *const c_char,
    chan_len: usize,
) -> *mut *mut c_char {
    let host = fake(glirc);
    let state = host.state.lock();
    let network = bytes(net, net_len).unwrap_or_default();
    let channel = bytes(chan, chan_len).unwrap_or_default();
    match state.channel(network, channel) {
        Some(channel) => host.alloc_array(channel.users.iter().map(|(nick, _)| nick.as_slice())),
        None => ptr::null_mut(),
    }
}

unsafe extern "C" fn fake_my_nick(glirc: *mut Glirc, net: *const c_char, net_len: usize) -> *mut c_char {
    let host = fake(glirc);
    let state = host.state.lock();
    let nick = state
        .network(bytes(net, net_len).unwrap_or_default())
        .and_then(|n| n.nick.as_deref());
    host.alloc_optional(nick)
}

unsafe extern "C" fn fake_user_account(
    glirc: *mut Glirc,
    net: *const c_char,
    net_len: usize,
    nick: *const c_char,
    nick_len: usize,
) -> *mut c_char {
    let host = fake(glirc);
    let state = host.state.lock();
    let nick = bytes(nick, nick_len).unwrap_or_default();
    let account = state
        .network(bytes(net, net_len).unwrap_or_default())
        .and_then(|n| n.accounts.iter().find(|(who, _)| same_id(who, nick)))
        .map(|(_, account)| account.as_slice());
    host.alloc_optional(account)
}

unsafe extern "C" fn fake_user_channel_modes(
    glirc: *mut Glirc,
    net: *const c_char,
    net_len: usize,
    chan: *const c_char,
    chan_len: usize,
    nick: *const c_char,
    nick_len: usize,
) -> *mut c_char {
    let host = fake(glirc);
    let state = host.state.lock();
    let nick = bytes(nick, nick_len).unwrap_or_default();
    let sigils = state
        .channel(
            bytes(net, net_len).unwrap_or_default(),
            bytes(chan, chan_len).unwrap_or_default(),
        )
        .and_then(|c| c.users.iter().find(|(who, _)| same_id(who, nick)))
        .map(|(_, sigils)| sigils.as_slice());
    host.alloc_optional(sigils)
}

unsafe extern "C" fn fake_resolve_path(glirc: *mut Glirc, path: *const c_char, path_len: usize) -> *mut c_char {
    let host = fake(glirc);
    let path = bytes(path, path_len).unwrap_or_default();
    if path.is_empty() {
        return ptr::null_mut();
    }
    let resolved = if path.starts_with(b"/") {
        path.to_vec()
    } else if let Some(rest) = path.strip_prefix(b"~/") {
        [&b"/home/user/"[..], rest].concat()
    } else {
        [&b"/home/user/.config/glirc/"[..], path].concat()
    };
    host.alloc_string(&resolved)
}

unsafe extern "C" fn fake_mark_seen(
    glirc: *mut Glirc,
    net: *const c_char,
    net_len: usize,
    chan: *const c_char,
    chan_len: usize,
) {
    let args = (bytes(net, net_len).map(<[u8]>::to_vec), bytes(chan, chan_len).map(<[u8]>::to_vec));
    fake(glirc).state.lock().seen.push(args);
}

unsafe extern "C" fn fake_clear_window(
    glirc: *mut Glirc,
    net: *const c_char,
    net_len: usize,
    chan: *const c_char,
    chan_len: usize,
) {
    let args = (bytes(net, net_len).map(<[u8]>::to_vec), bytes(chan, chan_len).map(<[u8]>::to_vec));
    fake(glirc).state.lock().cleared.push(args);
}

unsafe extern "C" fn fake_current_focus(
    glirc: *mut Glirc,
    net: *mut *mut c_char,
    net_len: *mut usize,
    tgt: *mut *mut c_char,
    tgt_len: *mut usize,
) {
    let host = fake(glirc);
    let state = host.state.lock();
    let (network, target) = &state.focus;
    *net = host.alloc_optional(network.as_deref());
    *net_len = network.as_ref().map_or(0, Vec::len);
    *tgt = host.alloc_optional(target.as_deref());
    *tgt_len = target.as_ref().map_or(0, Vec::len);
}

unsafe extern "C" fn fake_is_logged_on(
    glirc: *mut Glirc,
    net: *const c_char,
    net_len: usize,
    nick: *const c_char,
    nick_len: usize,
) -> c_int {
    let state = fake(glirc).state.lock();
    let nick = bytes(nick, nick_len).unwrap_or_default();
    state
        .network(bytes(net, net_len).unwrap_or_default())
        .map_or(false, |n| n.logged_on.iter().any(|who| same_id(who, nick))) as c_int
}

unsafe extern "C" fn fake_is_channel(
    _glirc: *mut Glirc,
    _net: *const c_char,
    _net_len: usize,
    tgt: *const c_char,
    tgt_len: usize,
) -> c_int {
    matches!(bytes(tgt, tgt_len).and_then(<[u8]>::first), Some(b'#' | b'&')) as c_int
}

unsafe extern "C" fn fake_set_timer(glirc: *mut Glirc, delay_ms: u64, callback: TimerCallback, token: *mut c_void) {
    fake(glirc).state.lock().timers.push(PendingTimer {
        delay_ms,
        callback,
        token: token as usize,
    });
}

unsafe extern "C" fn fake_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        release(ptr as usize);
    }
}

unsafe extern "C" fn fake_free_strings(list: *mut *mut c_char) {
    if list.is_null() {
        return;
    }
    release(list as usize);
    let mut cursor = list;
    while !(*cursor).is_null() {
        release(*cursor as usize);
        cursor = cursor.add(1);
    }
}

/// Entry point table backed by `FakeHost`
pub static FAKE_API: GlircApi = GlircApi {
    send_message: fake_send_message,
    inject_chat: fake_inject_chat,
    print: fake_print,
    list_networks: fake_list_networks,
    list_channels: fake_list_channels,
    list_channel_users: fake_list_channel_users,
    my_nick: fake_my_nick,
    user_account: fake_user_account,
    user_channel_modes: fake_user_channel_modes,
    resolve_path: fake_resolve_path,
    mark_seen: fake_mark_seen,
    clear_window: fake_clear_window,
    current_focus: fake_current_focus,
    is_logged_on: fake_is_logged_on,
    is_channel: fake_is_channel,
    set_timer: fake_set_timer,
    free_string: fake_free_string,
    free_strings: fake_free_strings,
};
