//! Demo dataset for local development.
//!
//! Creates three users, a trip with all of them as members, a couple of
//! expenses (one itemized), and a pending payment, so the mobile client has
//! something realistic to render against a fresh dev server.

use crate::TestApp;
use anyhow::Result;
use payloads::{TripId, requests};
use rust_decimal::dec;
use tracing::info;

pub struct DevDataset {
    pub trip_id: TripId,
}

impl DevDataset {
    pub async fn create(app: &TestApp) -> Result<Self> {
        let trip_id = app.create_three_person_trip().await?;

        // Alice pays for a shared dinner, itemized with a 20% tip
        let alice_id = app.member_id(&trip_id, "alice").await?;
        let bob_id = app.member_id(&trip_id, "bob").await?;
        let carol_id = app.member_id(&trip_id, "carol").await?;
        app.client
            .create_expense(
                &trip_id,
                &requests::CreateExpense::Itemized(
                    requests::CreateItemizedExpense {
                        title: "Dinner at Luigi's".into(),
                        items: vec![
                            requests::ItemInput {
                                name: "Margherita".into(),
                                price: dec!(18.00),
                                assigned_user_ids: vec![alice_id, bob_id],
                            },
                            requests::ItemInput {
                                name: "House Red".into(),
                                price: dec!(24.00),
                                assigned_user_ids: vec![
                                    alice_id, bob_id, carol_id,
                                ],
                            },
                        ],
                        tax: dec!(3.36),
                        tip: Some(requests::TipInput::Percent {
                            value: dec!(20),
                        }),
                    },
                ),
            )
            .await?;

        // Bob covers the taxi with an even split
        app.login_bob().await?;
        app.client
            .create_expense(
                &trip_id,
                &requests::CreateExpense::Simple(
                    requests::CreateSimpleExpense {
                        title: "Airport taxi".into(),
                        amount: dec!(45.00),
                        splits: vec![
                            requests::SplitInput {
                                user_id: alice_id,
                                share: dec!(15.00),
                            },
                            requests::SplitInput {
                                user_id: bob_id,
                                share: dec!(15.00),
                            },
                            requests::SplitInput {
                                user_id: carol_id,
                                share: dec!(15.00),
                            },
                        ],
                    },
                ),
            )
            .await?;

        // Carol starts settling up with Alice
        app.login_carol().await?;
        app.client
            .create_payment(
                &trip_id,
                &requests::CreatePayment {
                    to_user_id: Some(alice_id),
                    to_username: None,
                    amount: dec!(10.00),
                    method: Some("venmo".into()),
                },
            )
            .await?;

        app.login_alice().await?;
        Ok(Self { trip_id })
    }

    pub fn print_summary(&self) {
        info!("Demo data:");
        info!("  users: alice / bob / carol (see test-helpers credentials)");
        info!("  trip:  {} with two expenses", self.trip_id);
        info!("  one pending payment carol -> alice awaiting confirmation");
    }
}
