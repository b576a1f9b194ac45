use payloads::requests::ParseReceipt;
use reqwest::StatusCode;
use rust_decimal::dec;

use test_helpers::{assert_status_code, spawn_app};

#[tokio::test]
async fn parses_receipt_text_without_side_effects() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;

    let parsed = app
        .client
        .parse_receipt(
            &trip_id,
            &ParseReceipt {
                raw_text: "Pizza  $10.99\nSoda  $2.50\nSubtotal  $13.49\nTax  $1.20\nTotal  $14.69".into(),
            },
        )
        .await?;

    assert_eq!(parsed.items.len(), 2);
    assert_eq!(parsed.items[0].name, "Pizza");
    assert_eq!(parsed.items[0].price, dec!(10.99));
    assert_eq!(parsed.items[1].name, "Soda");
    assert_eq!(parsed.items[1].price, dec!(2.50));
    assert_eq!(parsed.subtotal, dec!(13.49));
    assert_eq!(parsed.tax, dec!(1.20));
    assert_eq!(parsed.tip, dec!(0.00));
    assert_eq!(parsed.total, dec!(14.69));
    assert!(parsed.confidence >= 0.8);
    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.source, "rules");

    // parsing never persists anything
    let expenses = app.client.get_expenses(&trip_id).await?;
    assert!(expenses.is_empty());

    Ok(())
}

#[tokio::test]
async fn garbage_input_returns_best_effort() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;

    let parsed = app
        .client
        .parse_receipt(
            &trip_id,
            &ParseReceipt {
                raw_text: "###\n%%%\n???".into(),
            },
        )
        .await?;

    assert!(parsed.items.is_empty());
    assert!(!parsed.warnings.is_empty());
    assert!(parsed.confidence < 0.5);

    Ok(())
}

#[tokio::test]
async fn non_member_cannot_parse_receipts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;

    app.create_carol_user().await?;
    app.login_carol().await?;
    let result = app
        .client
        .parse_receipt(
            &trip_id,
            &ParseReceipt {
                raw_text: "Total $5.00".into(),
            },
        )
        .await;

    assert_status_code(result, StatusCode::FORBIDDEN);

    Ok(())
}
