pub fn short_hex(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() <= 10 {
        return trimmed.to_string();
    }
    let prefix_len = 6.min(trimmed.len());
    let suffix_len = 4.min(trimmed.len().saturating_sub(prefix_len));
    let prefix = &trimmed[..prefix_len];
    let suffix = &trimmed[trimmed.len() - suffix_len..];
    format!("{}...{}", prefix, suffix)
}

/// Collects the rendered buffer into one string per row.
#[cfg(test)]
pub fn buffer_lines(buffer: &ratatui::buffer::Buffer) -> Vec<String> {
    let area = buffer.area;
    (area.top()..area.bottom())
        .map(|y| {
            (area.left()..area.right())
                .map(|x| buffer[(x, y)].symbol())
                .collect::<String>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortens_long_hex() {
        assert_eq!(
            short_hex("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            "0xf39F...2266"
        );
        assert_eq!(short_hex(" 0x1234 "), "0x1234");
    }
}
