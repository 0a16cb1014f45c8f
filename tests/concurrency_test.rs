//! Races against a database file shared by several pooled connections, so
//! transactions interleave instead of queueing on a single connection.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{
    errors::ServiceError,
    services::{CartItem, RegisterUserInput},
};

const CONNECTIONS: u32 = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_checkouts_convert_the_cart_once() {
    let app = TestApp::with_file_database(CONNECTIONS).await;
    let user = app.seed_user("alice").await;
    let mug = app.seed_product("Mug", dec!(10)).await;
    let lamp = app.seed_product("Lamp", dec!(25.5)).await;
    let cart = app.state.services.cart.clone();
    let checkout = app.state.services.checkout.clone();

    cart.add_item(user, mug, 2).await.unwrap();
    cart.add_item(user, lamp, 1).await.unwrap();

    let mut tasks = vec![];
    for _ in 0..6 {
        let checkout = checkout.clone();
        tasks.push(tokio::spawn(async move { checkout.place_order(user).await }));
    }

    let mut placed = 0;
    for task in tasks {
        match task.await.expect("task") {
            Ok(summary) => {
                placed += 1;
                assert_eq!(summary.line_count, 2);
            }
            Err(ServiceError::EmptyCart(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(placed, 1, "exactly one checkout may convert the cart");
    let orders = checkout.list_orders(user).await.unwrap();
    let quantities: Vec<_> = orders.iter().map(|o| (o.product_id, o.quantity)).collect();
    assert_eq!(quantities, vec![(mug, 2), (lamp, 1)]);
    assert!(cart.list_items(user).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_checkouts_for_different_users_stay_separate() {
    let app = TestApp::with_file_database(CONNECTIONS).await;
    let mug = app.seed_product("Mug", dec!(10)).await;
    let cart = app.state.services.cart.clone();
    let checkout = app.state.services.checkout.clone();

    let mut users = vec![];
    for (i, name) in ["alice", "bob", "carol", "dave"].into_iter().enumerate() {
        let user = app.seed_user(name).await;
        cart.add_item(user, mug, i as i32 + 1).await.unwrap();
        users.push(user);
    }

    let mut tasks = vec![];
    for &user in &users {
        let checkout = checkout.clone();
        tasks.push(tokio::spawn(async move { checkout.place_order(user).await }));
    }
    for task in tasks {
        task.await.expect("task").expect("every user checks out");
    }

    for (i, &user) in users.iter().enumerate() {
        let orders = checkout.list_orders(user).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].quantity, i as i32 + 1);
        assert!(cart.list_items(user).await.unwrap().is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_adds_merge_into_one_line() {
    let app = TestApp::with_file_database(CONNECTIONS).await;
    let user = app.seed_user("alice").await;
    let mug = app.seed_product("Mug", dec!(10)).await;
    let cart = app.state.services.cart.clone();

    let mut tasks = vec![];
    for _ in 0..8 {
        let cart = cart.clone();
        tasks.push(tokio::spawn(async move { cart.add_item(user, mug, 1).await }));
    }

    let mut line_ids = vec![];
    for task in tasks {
        line_ids.push(task.await.expect("task").expect("add_item"));
    }
    line_ids.dedup();

    assert_eq!(line_ids.len(), 1, "all adds must land on the same line");
    assert_eq!(
        cart.list_items(user).await.unwrap(),
        vec![CartItem {
            product_id: mug,
            quantity: 8
        }]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_registrations_admit_one_username() {
    let app = TestApp::with_file_database(CONNECTIONS).await;
    let accounts = app.state.services.accounts.clone();

    let mut tasks = vec![];
    for i in 0..6 {
        let accounts = accounts.clone();
        tasks.push(tokio::spawn(async move {
            accounts
                .register(RegisterUserInput {
                    username: "racer".to_string(),
                    email: "racer@example.com".to_string(),
                    password: format!("pw{}", i),
                })
                .await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.expect("task") {
            Ok(_) => successes += 1,
            Err(ServiceError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);
}
