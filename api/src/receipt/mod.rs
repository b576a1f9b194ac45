//! OCR receipt text to structured itemization.
//!
//! The parser is a pure function over text: it never persists anything and
//! never errors on malformed input. Problems surface through `warnings` and
//! a reduced `confidence`. The client reviews the result and resubmits it
//! as an itemized expense.

pub mod extract;
pub mod normalize;
pub mod verify;

pub use verify::ReceiptVerifier;

use payloads::responses::{ParsedReceipt, ReceiptItem};

use crate::money::{Cents, from_cents};

/// Shared app data for the receipt endpoint; the verifier is present only
/// when one is configured.
pub struct ReceiptConfig {
    pub verifier: Option<ReceiptVerifier>,
}

const SOURCE_RULES: &str = "rules";
const SOURCE_RULES_LLM: &str = "rules+llm";

// confidence weights, roughly proportional to how strongly each field
// anchors the parse; they sum to 1.0
const WEIGHT_MERCHANT: f64 = 0.10;
const WEIGHT_DATE: f64 = 0.05;
const WEIGHT_TOTAL: f64 = 0.25;
const WEIGHT_SUBTOTAL: f64 = 0.20;
const WEIGHT_TAX: f64 = 0.10;
const WEIGHT_ITEMS: f64 = 0.20;
const WEIGHT_AGREEMENT: f64 = 0.10;

const DISAGREEMENT_WARN_CENTS: Cents = 5;

/// Rules-only parse of raw OCR text.
pub fn parse(raw_text: &str) -> ParsedReceipt {
    let cleaned = normalize::clean_lines(raw_text);
    let merchant = extract::merchant(&cleaned);
    let transaction_date = extract::transaction_date(&cleaned);

    let content: Vec<String> = cleaned
        .iter()
        .filter(|line| !normalize::is_junk(line))
        .cloned()
        .collect();
    let content = extract::repair_scrambled(content);
    let content = extract::merge_quantities(content);

    let mut warnings = Vec::new();
    let mut totals = extract::totals(&content);
    if totals.total.is_none() {
        totals.total =
            extract::fallback_total(&content, totals.first_label_idx);
    }

    let candidates = extract::price_candidates(
        &content,
        totals.first_label_idx,
        &mut warnings,
    );
    let chosen: Vec<usize> = totals
        .subtotal
        .and_then(|subtotal| extract::choose_subset(&candidates, subtotal))
        .unwrap_or_else(|| (0..candidates.len()).collect());
    let items = extract::name_items(&content, &candidates, &chosen);

    let item_sum: Cents = items.iter().map(|(_, cents)| cents).sum();
    let subtotal = totals.subtotal.unwrap_or(item_sum);
    let tax = totals.tax.unwrap_or(0);
    let tip = totals.tip.unwrap_or(0);
    let total = totals.total.unwrap_or(subtotal + tax + tip);

    if items.is_empty() {
        warnings.push("no line items detected".to_string());
    }
    if (subtotal + tax + tip - total).abs() > DISAGREEMENT_WARN_CENTS {
        warnings.push(
            "subtotal, tax and tip do not reconcile with the total"
                .to_string(),
        );
    }
    if totals.subtotal.is_some()
        && !items.is_empty()
        && (item_sum - subtotal).abs() > DISAGREEMENT_WARN_CENTS
    {
        warnings
            .push("item prices do not add up to the subtotal".to_string());
    }

    let agreement =
        totals.subtotal.is_some() && (item_sum - subtotal).abs() <= 1;
    let mut confidence = 0.0;
    if merchant.is_some() {
        confidence += WEIGHT_MERCHANT;
    }
    if transaction_date.is_some() {
        confidence += WEIGHT_DATE;
    }
    if totals.total.is_some() {
        confidence += WEIGHT_TOTAL;
    }
    if totals.subtotal.is_some() {
        confidence += WEIGHT_SUBTOTAL;
    }
    if totals.tax.is_some() {
        confidence += WEIGHT_TAX;
    }
    if !items.is_empty() {
        confidence += WEIGHT_ITEMS;
    }
    if agreement {
        confidence += WEIGHT_AGREEMENT;
    }

    ParsedReceipt {
        merchant_name: merchant.unwrap_or_else(|| "Unknown".to_string()),
        transaction_date,
        items: items
            .into_iter()
            .map(|(name, cents)| ReceiptItem {
                name,
                price: from_cents(cents),
            })
            .collect(),
        subtotal: from_cents(subtotal.max(0)),
        tax: from_cents(tax.max(0)),
        tip: from_cents(tip.max(0)),
        total: from_cents(total.max(0)),
        warnings,
        confidence,
        source: SOURCE_RULES.to_string(),
    }
}

/// Rules parse, then an optional verifier pass. The verifier's absence or
/// failure never affects the result beyond leaving `source` at "rules".
pub async fn parse_with_verifier(
    raw_text: &str,
    verifier: Option<&ReceiptVerifier>,
) -> ParsedReceipt {
    let draft = parse(raw_text);
    let Some(verifier) = verifier else {
        return draft;
    };
    match verifier.verify(raw_text, &draft).await {
        Some(mut verified) => {
            verified.source = SOURCE_RULES_LLM.to_string();
            verified
        }
        None => draft,
    }
}
