//! 韩文数字单位格式化（만 / 억 / 조）

const UNITS: [&str; 5] = ["", "만", "억", "조", "경"];

/// 千分位分隔: 9960 → "9,960"
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// 按 4 位一组加单位: 1234500 → "123만 4,500"，为 0 的组省略
pub fn format_korean_units(number: i64) -> String {
    if number == 0 {
        return "0".to_string();
    }

    let sign = if number < 0 { "-" } else { "" };
    let mut rest = number.unsigned_abs();
    let mut parts = Vec::new();

    for unit in UNITS {
        if rest == 0 {
            break;
        }
        let part = rest % 10_000;
        rest /= 10_000;
        if part > 0 {
            parts.push(format!("{}{}", group_thousands(part), unit));
        }
    }

    parts.reverse();
    format!("{}{}", sign, parts.join(" "))
}

pub fn format_price_korean(price: i64) -> String {
    format!("{}원", format_korean_units(price))
}

/// 市值（单位：亿）→ "45조 9,960억원"；0 显示为 N/A
pub fn format_market_cap_korean(cap_in_eok: i64) -> String {
    if cap_in_eok <= 0 {
        return "N/A".to_string();
    }

    let trillion = cap_in_eok / 10_000;
    let billion = cap_in_eok % 10_000;

    let mut parts = Vec::new();
    if trillion > 0 {
        parts.push(format!("{}조", group_thousands(trillion as u64)));
    }
    if billion > 0 {
        parts.push(format!("{}억", group_thousands(billion as u64)));
    }
    format!("{}원", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(9960), "9,960");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_korean_units() {
        assert_eq!(format_korean_units(0), "0");
        assert_eq!(format_korean_units(4500), "4,500");
        assert_eq!(format_korean_units(10_000), "1만");
        assert_eq!(format_korean_units(1_234_500), "123만 4,500");
        assert_eq!(format_korean_units(100_000_001), "1억 1");
        assert_eq!(format_korean_units(-25_000), "-2만 5,000");
    }

    #[test]
    fn test_price() {
        assert_eq!(format_price_korean(71_300), "7만 1,300원");
        assert_eq!(format_price_korean(0), "0원");
    }

    #[test]
    fn test_market_cap() {
        assert_eq!(format_market_cap_korean(459_960), "45조 9,960억원");
        assert_eq!(format_market_cap_korean(10_000), "1조원");
        assert_eq!(format_market_cap_korean(3_500), "3,500억원");
        assert_eq!(format_market_cap_korean(0), "N/A");
    }
}
