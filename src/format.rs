/// Renders audience counts the way the platform header does: "10.7万" above ten thousand.
pub fn format_count(count: u64) -> String {
    if count >= 10_000 {
        format!("{:.1}万", count as f64 / 10_000.0)
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_counts_are_plain() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(9_999), "9999");
    }

    #[test]
    fn large_counts_use_wan() {
        assert_eq!(format_count(10_000), "1.0万");
        assert_eq!(format_count(107_000), "10.7万");
        assert_eq!(format_count(1_234_567), "123.5万");
    }
}
