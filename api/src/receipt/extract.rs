//! Field extraction over normalized receipt lines: money tokens, totals
//! labels, merchant, date, and the item list.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::money::Cents;
use crate::receipt::normalize;

/// Candidate prices above this count are not fed to the subset-sum search.
const MAX_PRICE_CANDIDATES: usize = 18;

/// Subset-sum targets above this many cents skip the search entirely.
const MAX_SUBSET_TARGET: Cents = 500_000;

const MERCHANT_WINDOW: usize = 5;
const TOTALS_LOOKAHEAD: usize = 8;
const NAME_BACKSCAN: usize = 6;
const NAME_FORWARD_SCAN: usize = 2;

static READABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]{2,}").unwrap());

static LEADING_QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+\s*(x\s+)?").unwrap());

static DATE_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

static DATE_NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b").unwrap()
});

static DATE_MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2}),?\s+(\d{4})\b",
    )
    .unwrap()
});

/// Parse one whitespace-delimited token as a money value in cents.
///
/// Accepts `$12.99` / `12.99` forms, `$`-prefixed whole dollars, and the
/// OCR dropped-decimal form: a bare 3-6 digit run reads as dollars+cents
/// when the result lands in [0.50, 1000.00).
pub(crate) fn parse_money_token(token: &str) -> Option<Cents> {
    let stripped = token.strip_prefix('$');
    let had_dollar = stripped.is_some();
    let t = stripped.unwrap_or(token);
    if t.is_empty() || t.contains('%') {
        return None;
    }

    if let Some((whole, frac)) = t.split_once('.') {
        if !whole.is_empty()
            && whole.bytes().all(|b| b.is_ascii_digit())
            && frac.len() == 2
            && frac.bytes().all(|b| b.is_ascii_digit())
        {
            let whole: Cents = whole.parse().ok()?;
            let frac: Cents = frac.parse().ok()?;
            return Some(whole * 100 + frac);
        }
        return None;
    }

    if t.bytes().all(|b| b.is_ascii_digit()) {
        if had_dollar && t.len() <= 2 {
            return t.parse::<Cents>().ok().map(|n| n * 100);
        }
        if (3..=6).contains(&t.len()) {
            let cents: Cents = t.parse().ok()?;
            if (50..100_000).contains(&cents) {
                return Some(cents);
            }
        }
    }
    None
}

/// The whole line is a single money value (percent lines never parse).
pub(crate) fn money_only(line: &str) -> Option<Cents> {
    if line.contains('%') {
        return None;
    }
    let mut tokens = line.split_whitespace();
    let token = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    parse_money_token(token)
}

/// A money value at the end of the line; returns the preceding text too.
pub(crate) fn trailing_money(line: &str) -> Option<(&str, Cents)> {
    if line.contains('%') {
        return None;
    }
    let (prefix, last) = line.rsplit_once(char::is_whitespace)?;
    let cents = parse_money_token(last)?;
    Some((prefix.trim_end(), cents))
}

pub(crate) fn has_money_value(line: &str) -> bool {
    money_only(line).is_some() || trailing_money(line).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TotalsLabel {
    Subtotal,
    Tax,
    Tip,
    Total,
}

pub(crate) fn totals_label(line: &str) -> Option<TotalsLabel> {
    let lower = line.to_ascii_lowercase();
    if lower.contains("subtotal") || lower.contains("sub total") {
        return Some(TotalsLabel::Subtotal);
    }
    if lower.contains("tax") {
        return Some(TotalsLabel::Tax);
    }
    if lower.contains("tip") || lower.contains("gratuity") {
        return Some(TotalsLabel::Tip);
    }
    if lower.contains("total")
        || lower.contains("amount due")
        || lower.contains("balance due")
    {
        return Some(TotalsLabel::Total);
    }
    None
}

pub(crate) fn is_readable(line: &str) -> bool {
    READABLE.is_match(line)
}

/// A line usable as an item name: readable text with no money value and no
/// totals label.
pub(crate) fn is_item_name_like(line: &str) -> bool {
    is_readable(line)
        && !has_money_value(line)
        && totals_label(line).is_none()
        && !normalize::is_junk(line)
}

/// Reorder (header, items, totals) when OCR scrambled totals above items.
pub(crate) fn repair_scrambled(lines: Vec<String>) -> Vec<String> {
    let first_totals = lines.iter().position(|l| totals_label(l).is_some());
    let first_item = lines
        .iter()
        .position(|l| has_money_value(l) && totals_label(l).is_none());
    let (Some(totals_at), Some(item_at)) = (first_totals, first_item) else {
        return lines;
    };
    if totals_at >= item_at {
        return lines;
    }

    let mut header = Vec::new();
    let mut totals = Vec::new();
    let mut body = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if totals_label(line).is_some() {
            totals.push(line.clone());
            // keep a label's detached amount line attached to it
            if trailing_money(line).is_none()
                && i + 1 < lines.len()
                && money_only(&lines[i + 1]).is_some()
            {
                totals.push(lines[i + 1].clone());
                i += 1;
            }
        } else if i < totals_at && !has_money_value(line) {
            header.push(line.clone());
        } else {
            body.push(line.clone());
        }
        i += 1;
    }

    header.into_iter().chain(body).chain(totals).collect()
}

/// Merge a bare "1" quantity line into the item-name line that follows it.
pub(crate) fn merge_quantities(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut iter = lines.into_iter().peekable();
    while let Some(line) = iter.next() {
        if line == "1"
            && iter.peek().is_some_and(|next| is_readable(next))
        {
            let next = iter.next().unwrap();
            out.push(format!("1 {next}"));
        } else {
            out.push(line);
        }
    }
    out
}

/// Prefer the nearest readable line above a detected address; otherwise the
/// first readable non-junk, non-money line in the top window.
pub(crate) fn merchant(cleaned: &[String]) -> Option<String> {
    let candidate = |line: &&String| -> bool {
        is_readable(line)
            && !normalize::is_junk(line)
            && !has_money_value(line)
            && totals_label(line).is_none()
    };
    if let Some(address_at) =
        cleaned.iter().position(|l| normalize::is_address(l))
    {
        if let Some(found) =
            cleaned[..address_at].iter().rev().find(candidate)
        {
            return Some(found.clone());
        }
    }
    cleaned.iter().take(MERCHANT_WINDOW).find(candidate).cloned()
}

/// First recognizable date, normalized to YYYY-MM-DD.
pub(crate) fn transaction_date(cleaned: &[String]) -> Option<String> {
    for line in cleaned {
        if let Some(caps) = DATE_ISO.captures(line) {
            let (y, m, d) = (
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            );
            if let Some(date) = valid_date(y, m, d) {
                return Some(date);
            }
        }
        if let Some(caps) = DATE_NUMERIC.captures(line) {
            let m: i32 = caps[1].parse().ok()?;
            let d: i32 = caps[2].parse().ok()?;
            let mut y: i32 = caps[3].parse().ok()?;
            if y < 100 {
                y += 2000;
            }
            if let Some(date) = valid_date(y, m, d) {
                return Some(date);
            }
        }
        if let Some(caps) = DATE_MONTH_NAME.captures(line) {
            let m = month_number(&caps[1]);
            let d: i32 = caps[2].parse().ok()?;
            let y: i32 = caps[3].parse().ok()?;
            if let Some(date) = valid_date(y, m, d) {
                return Some(date);
            }
        }
    }
    None
}

fn month_number(name: &str) -> i32 {
    match name.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => 0,
    }
}

fn valid_date(y: i32, m: i32, d: i32) -> Option<String> {
    if (1900..=2100).contains(&y)
        && (1..=12).contains(&m)
        && (1..=31).contains(&d)
    {
        Some(format!("{y:04}-{m:02}-{d:02}"))
    } else {
        None
    }
}

#[derive(Debug, Default)]
pub(crate) struct Totals {
    pub subtotal: Option<Cents>,
    pub tax: Option<Cents>,
    pub tip: Option<Cents>,
    pub total: Option<Cents>,
    pub first_label_idx: Option<usize>,
}

/// Locate labeled totals; a label's amount is on the same line or the
/// nearest following money-only line within the lookahead window.
pub(crate) fn totals(content: &[String]) -> Totals {
    let mut found = Totals::default();
    for (i, line) in content.iter().enumerate() {
        let Some(label) = totals_label(line) else {
            continue;
        };
        if found.first_label_idx.is_none() {
            found.first_label_idx = Some(i);
        }
        let slot = match label {
            TotalsLabel::Subtotal => &mut found.subtotal,
            TotalsLabel::Tax => &mut found.tax,
            TotalsLabel::Tip => &mut found.tip,
            TotalsLabel::Total => &mut found.total,
        };
        if slot.is_some() {
            continue;
        }
        *slot = trailing_money(line).map(|(_, cents)| cents).or_else(|| {
            content[i + 1..]
                .iter()
                .take(TOTALS_LOOKAHEAD)
                .find_map(|l| money_only(l))
        });
    }

    // a missing subtotal can be derived once total and tax/tip are known
    if found.subtotal.is_none()
        && let Some(total) = found.total
        && (found.tax.is_some() || found.tip.is_some())
    {
        let derived =
            total - found.tax.unwrap_or(0) - found.tip.unwrap_or(0);
        if derived > 0 {
            found.subtotal = Some(derived);
        }
    }

    found
}

/// Largest money value in the tail of the receipt, as a last-resort total.
pub(crate) fn fallback_total(
    content: &[String],
    first_label_idx: Option<usize>,
) -> Option<Cents> {
    let start = first_label_idx.unwrap_or(content.len() * 2 / 3);
    content[start.min(content.len())..]
        .iter()
        .filter_map(|line| {
            money_only(line)
                .or_else(|| trailing_money(line).map(|(_, c)| c))
        })
        .max()
}

/// Money values between the content start and the first totals label,
/// carrying the same-line name prefix when one exists.
#[derive(Debug, Clone)]
pub(crate) struct PriceCandidate {
    pub line_idx: usize,
    pub cents: Cents,
    pub inline_name: Option<String>,
}

pub(crate) fn price_candidates(
    content: &[String],
    first_label_idx: Option<usize>,
    warnings: &mut Vec<String>,
) -> Vec<PriceCandidate> {
    let region_end = first_label_idx.unwrap_or(content.len());
    let mut candidates = Vec::new();
    for (line_idx, line) in content[..region_end].iter().enumerate() {
        if totals_label(line).is_some() {
            continue;
        }
        if let Some(cents) = money_only(line) {
            if cents > 0 {
                candidates.push(PriceCandidate {
                    line_idx,
                    cents,
                    inline_name: None,
                });
            }
        } else if let Some((prefix, cents)) = trailing_money(line) {
            if cents > 0 {
                let inline_name = clean_item_name(prefix);
                candidates.push(PriceCandidate {
                    line_idx,
                    cents,
                    inline_name,
                });
            }
        }
    }
    if candidates.len() > MAX_PRICE_CANDIDATES {
        warnings.push(format!(
            "only the first {MAX_PRICE_CANDIDATES} of {} price candidates were considered",
            candidates.len()
        ));
        candidates.truncate(MAX_PRICE_CANDIDATES);
    }
    candidates
}

fn clean_item_name(prefix: &str) -> Option<String> {
    let name = LEADING_QUANTITY.replace(prefix, "");
    let name = name.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ':' | '-' | '.' | '*' | '#')
    });
    if READABLE.is_match(name) {
        Some(name.to_string())
    } else {
        None
    }
}

/// Pick the subset of candidates whose prices sum to the subtotal within
/// ±1¢, preferring an exact match. Returns indices into the candidate
/// slice, in input order.
pub(crate) fn choose_subset(
    candidates: &[PriceCandidate],
    target: Cents,
) -> Option<Vec<usize>> {
    if target <= 0 || target > MAX_SUBSET_TARGET || candidates.is_empty() {
        return None;
    }
    let bound = (target + 1) as usize;
    // parent[s] remembers which candidate first reached sum s and from where
    let mut parent: Vec<Option<(usize, usize)>> = vec![None; bound + 1];
    let mut reachable = vec![false; bound + 1];
    reachable[0] = true;
    for (idx, candidate) in candidates.iter().enumerate() {
        let price = candidate.cents as usize;
        if price == 0 || price > bound {
            continue;
        }
        for sum in (0..=bound - price).rev() {
            if reachable[sum] && !reachable[sum + price] {
                reachable[sum + price] = true;
                parent[sum + price] = Some((sum, idx));
            }
        }
    }

    let goals = [target, target + 1, target - 1];
    let goal = goals
        .into_iter()
        .find(|g| *g > 0 && reachable[*g as usize])?;

    let mut chosen = Vec::new();
    let mut sum = goal as usize;
    while sum != 0 {
        let (prev, idx) = parent[sum]?;
        chosen.push(idx);
        sum = prev;
    }
    chosen.sort_unstable();
    Some(chosen)
}

/// Resolve names for the chosen prices: same-line prefix first, then a
/// back-scan for the nearest unused name line, then a short forward scan,
/// and finally the "Item" placeholder.
pub(crate) fn name_items(
    content: &[String],
    candidates: &[PriceCandidate],
    chosen: &[usize],
) -> Vec<(String, Cents)> {
    let mut used_lines: HashSet<usize> = HashSet::new();
    let mut items = Vec::with_capacity(chosen.len());
    for &idx in chosen {
        let candidate = &candidates[idx];
        let name = if let Some(name) = &candidate.inline_name {
            name.clone()
        } else {
            scan_for_name(content, candidate.line_idx, &mut used_lines)
                .unwrap_or_else(|| "Item".to_string())
        };
        items.push((name, candidate.cents));
    }
    items
}

fn scan_for_name(
    content: &[String],
    line_idx: usize,
    used_lines: &mut HashSet<usize>,
) -> Option<String> {
    let back_start = line_idx.saturating_sub(NAME_BACKSCAN);
    for i in (back_start..line_idx).rev() {
        if !used_lines.contains(&i) && is_item_name_like(&content[i]) {
            used_lines.insert(i);
            return clean_item_name(&content[i]);
        }
    }
    for i in line_idx + 1
        ..(line_idx + 1 + NAME_FORWARD_SCAN).min(content.len())
    {
        if !used_lines.contains(&i) && is_item_name_like(&content[i]) {
            used_lines.insert(i);
            return clean_item_name(&content[i]);
        }
    }
    None
}
