//! mIRC formatting codes exposed as `glirc.format`

/// `(name, control sequence)` in display order
pub const FORMAT_CODES: [(&str, &str); 21] = [
    ("reset", "\x0f"),
    ("bold", "\x02"),
    ("italic", "\x1d"),
    ("underline", "\x1f"),
    ("reverse", "\x16"),
    ("white", "\x0300"),
    ("black", "\x0301"),
    ("blue", "\x0302"),
    ("green", "\x0303"),
    ("red", "\x0304"),
    ("brown", "\x0305"),
    ("purple", "\x0306"),
    ("orange", "\x0307"),
    ("yellow", "\x0308"),
    ("light_green", "\x0309"),
    ("cyan", "\x0310"),
    ("light_cyan", "\x0311"),
    ("light_blue", "\x0312"),
    ("pink", "\x0313"),
    ("gray", "\x0314"),
    ("light_gray", "\x0315"),
];
