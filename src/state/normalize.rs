const FRAME_PREFIX: &str = "data:";

/// Turns raw accumulated stream text into the single-block display form.
///
/// Every line loses its leading whitespace and any number of `data:` framing
/// prefixes (with the spaces or tabs that follow them); line breaks become
/// single spaces; the result is trimmed. Total and idempotent.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for (index, line) in split_lines(raw).enumerate() {
        if index > 0 {
            out.push(' ');
        }
        out.push_str(strip_framing(line));
    }

    out.trim().to_string()
}

fn split_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .flat_map(|line| line.split('\r'))
}

fn strip_framing(line: &str) -> &str {
    let mut rest = line.trim_start();
    while let Some(after) = rest.strip_prefix(FRAME_PREFIX) {
        rest = after.trim_start();
    }
    rest
}
