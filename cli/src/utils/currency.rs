/// Format an amount as dollars with thousands separators and two decimals.
///
/// Negative amounts keep the sign after the currency symbol (`$-1,234.50`),
/// the way the price estimator has always displayed them.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // Sign follows the input even when the digits round to zero: `$-0.00`
    let sign = if amount.is_sign_negative() { "-" } else { "" };
    format!("${}{}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(23456.7), "$23,456.70");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(100.0), "$100.00");
        assert_eq!(format_currency(-1234.5), "$-1,234.50");
    }

    #[test]
    fn test_negative_amounts_rounding_to_zero_keep_their_sign() {
        assert_eq!(format_currency(-0.001), "$-0.00");
        assert_eq!(format_currency(-0.0), "$-0.00");
        assert_eq!(format_currency(0.001), "$0.00");
    }
}
