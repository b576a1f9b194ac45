//! Line-level cleanup and junk classification for OCR'd receipt text.
//!
//! OCR output is noisy in predictable ways; the repairs here are applied
//! only where the reading is unambiguous, everything else is left alone
//! for the extraction pass to judge.

use std::sync::LazyLock;

use regex::Regex;

static COMMA_THOUSANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d),(\d{3})\b").unwrap());

// a leading capital S in front of digits is a misread dollar sign
static S_FOR_DOLLAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)S(\d)").unwrap());

// letter O inside a $-prefixed money token is a misread zero
static MONEY_TOKEN_WITH_O: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[0-9O]+(?:\.[0-9O]{2})?").unwrap());

// "10 99" at the end of a line is a dropped decimal point
static SPLIT_CENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,4}) (\d{2})$").unwrap());

// "Iiax", "1ax", "lax" are misreads of "Tax"
static TAX_GARBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[Il1i|]+ax\b").unwrap());

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?\d{3}\)?[-. ]\d{3}[-. ]\d{4}").unwrap()
});

static STREET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(street|avenue|ave|blvd|boulevard|road|rd|drive|dr|lane|ln|suite|ste|hwy|highway|pkwy|parkway|plaza)\b",
    )
    .unwrap()
});

static STATE_ZIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z]{2}\.?,?\s+\d{5}(?:-\d{4})?\b").unwrap()
});

static CARD_METADATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(visa|mastercard|amex|discover|debit|credit|card|cash|change|tender(ed)?|auth|approved|approval|terminal|merchant|batch|chip|swiped|entry|acct|account)\b",
    )
    .unwrap()
});

static PROMO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(survey|feedback|www\.|http|\.com|thank you|come again|see you soon|return policy|coupon|rewards|tell us|join our|save \$)",
    )
    .unwrap()
});

static LONG_NUMERIC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{8,}").unwrap());

static PURE_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\d+\s*(x|@|ea|each)?$").unwrap()
});

/// Collapse whitespace and repair the known OCR confusions on one line.
pub fn clean_line(line: &str) -> String {
    let mut s = line.split_whitespace().collect::<Vec<_>>().join(" ");

    // repeated application handles multi-group values like 1,234,567
    while COMMA_THOUSANDS.is_match(&s) {
        s = COMMA_THOUSANDS.replace_all(&s, "${1}${2}").into_owned();
    }

    s = S_FOR_DOLLAR.replace_all(&s, "${1}$$${2}").into_owned();
    s = MONEY_TOKEN_WITH_O
        .replace_all(&s, |caps: &regex::Captures| {
            caps[0].replace('O', "0")
        })
        .into_owned();
    s = SPLIT_CENTS.replace_all(&s, "${1}.${2}").into_owned();
    s = TAX_GARBLE.replace_all(&s, "Tax").into_owned();

    s
}

pub fn clean_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Street-address detection; also used to anchor merchant extraction.
pub fn is_address(line: &str) -> bool {
    let has_digit = line.chars().any(|c| c.is_ascii_digit());
    (has_digit && STREET.is_match(line)) || STATE_ZIP.is_match(line)
}

/// Lines that carry no item or totals information.
pub fn is_junk(line: &str) -> bool {
    if line.is_empty() {
        return true;
    }
    // bare "1" survives for the quantity-merge pass
    if line == "1" {
        return false;
    }
    is_address(line)
        || PHONE.is_match(line)
        || CARD_METADATA.is_match(line)
        || PROMO.is_match(line)
        || LONG_NUMERIC_ID.is_match(line)
        || PURE_QUANTITY.is_match(line)
}
