//! Side-by-side ASCII and hex rendering of frames, 16 bytes per line

const BYTES_PER_LINE: usize = 16;

pub fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for line in bytes.chunks(BYTES_PER_LINE) {
        for i in 0..BYTES_PER_LINE {
            out.push(match line.get(i) {
                Some(b) if (0x20..=0x7e).contains(b) => *b as char,
                Some(_) => '.',
                None => ' ',
            });
        }
        out.push_str(" | ");
        let hex: Vec<String> = line.iter().map(|b| format!("{b:2X}")).collect();
        out.push_str(&hex.join(" "));
        out.push('\n');
    }
    out
}
