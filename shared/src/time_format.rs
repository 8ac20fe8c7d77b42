use std::fmt::Write;

/// Format a countdown as `MM:SS`. Minutes keep counting past an hour.
pub fn format_mmss(total_secs: u32) -> String {
    let mut out = String::with_capacity(5);
    write_mmss(&mut out, total_secs);
    out
}

pub fn write_mmss(buf: &mut String, total_secs: u32) {
    buf.clear();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    let _ = write!(buf, "{minutes:02}:{seconds:02}");
}
