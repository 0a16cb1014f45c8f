//! Property-based tests for cart accumulation and catalog validation.

mod common;

use common::TestApp;
use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_api::errors::ServiceError;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

// Property: a cart line's quantity is the sum of every successful add
proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn repeated_adds_sum_into_one_line(quantities in prop::collection::vec(1i32..50, 1..8)) {
        let (lines, total) = runtime().block_on(async {
            let app = TestApp::new().await;
            let user = app.seed_user("prop").await;
            let product = app.seed_product("Widget", Decimal::from(3)).await;
            let cart = app.state.services.cart.clone();

            for quantity in &quantities {
                cart.add_item(user, product, *quantity).await.expect("add_item");
            }
            let items = cart.list_items(user).await.expect("list_items");
            (items.len(), items.first().map(|item| item.quantity))
        });

        prop_assert_eq!(lines, 1);
        prop_assert_eq!(total, Some(quantities.iter().sum::<i32>()));
    }

    #[test]
    fn checkout_preserves_every_quantity(quantities in prop::collection::vec(1i32..20, 1..5)) {
        let placed = runtime().block_on(async {
            let app = TestApp::new().await;
            let user = app.seed_user("prop").await;
            let cart = app.state.services.cart.clone();

            let mut expected = Vec::new();
            for (i, quantity) in quantities.iter().enumerate() {
                let product = app
                    .seed_product(&format!("Item {}", i), Decimal::from(1))
                    .await;
                cart.add_item(user, product, *quantity).await.expect("add_item");
                expected.push((product, *quantity));
            }

            let summary = app.state.services.checkout.place_order(user).await.expect("checkout");
            let mut placed: Vec<(i32, i32)> = summary
                .lines
                .iter()
                .map(|line| (line.product_id, line.quantity))
                .collect();
            placed.sort();
            expected.sort();
            (placed == expected, cart.list_items(user).await.expect("list").is_empty())
        });

        prop_assert!(placed.0, "order lines must mirror the cart");
        prop_assert!(placed.1, "cart must be empty after checkout");
    }
}

// Property: negative prices are always rejected, non-negative ones accepted
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn price_sign_decides_acceptance(cents in -100_000i64..100_000) {
        let price = Decimal::new(cents, 2);
        let result = runtime().block_on(async {
            let app = TestApp::new().await;
            app.state.services.catalog.create_product("Priced", price).await
        });

        if cents < 0 {
            prop_assert!(matches!(result, Err(ServiceError::ValidationError(_))));
        } else {
            prop_assert!(result.is_ok());
        }
    }
}
