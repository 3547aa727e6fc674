// 💲 Amount formatting for summaries and tooltips

/// `$1.2B`, `$3.4M`, `$5.6K` or `$7.0`
pub fn format_dollar_amount(amount: f64, decimals: usize) -> String {
    if amount >= 1e9 {
        format!("${:.*}B", decimals, amount / 1e9)
    } else if amount >= 1e6 {
        format!("${:.*}M", decimals, amount / 1e6)
    } else if amount >= 1e3 {
        format!("${:.*}K", decimals, amount / 1e3)
    } else {
        format!("${:.*}", decimals, amount)
    }
}

pub fn format_per_capita_amount(amount: f64, decimals: usize) -> String {
    format!("${:.*}", decimals, amount)
}
