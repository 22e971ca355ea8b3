/// Format a float as a French-locale euro amount: 1 234,56 €
pub fn euros(val: f64) -> String {
    let negative = val < 0.0 && (val * 100.0).round() != 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("-{grouped},{dec_part} €")
    } else {
        format!("{grouped},{dec_part} €")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euro_formatting() {
        assert_eq!(euros(1234.56), "1 234,56 €");
        assert_eq!(euros(-14.1), "-14,10 €");
        assert_eq!(euros(0.0), "0,00 €");
        assert_eq!(euros(1000000.99), "1 000 000,99 €");
        assert_eq!(euros(-0.001), "0,00 €");
    }
}
