// Property-based tests for ledger balance invariants.
// CI: 64 cases (default). Soak: PROPTEST_CASES=2000 cargo test --release

use chrono::NaiveDate;
use fx_ledger::prelude::*;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(64),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

const CURRENCIES: [&str; 3] = ["USD", "EUR", "ILS"];

fn code(s: &str) -> CurrencyCode {
    CurrencyCode::new(s).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Deposit { user: usize, currency: usize, cents: i64 },
    Withdraw { user: usize, currency: usize, cents: i64 },
    Convert { user: usize, from: usize, to: usize, cents: i64 },
    Transfer { user: usize, to_user: usize, from: usize, to: usize, cents: i64 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    let user = 0..2usize;
    let currency = 0..CURRENCIES.len();
    let cents = 1..50_000i64;
    prop_oneof![
        (user.clone(), currency.clone(), cents.clone())
            .prop_map(|(user, currency, cents)| Op::Deposit { user, currency, cents }),
        (user.clone(), currency.clone(), cents.clone())
            .prop_map(|(user, currency, cents)| Op::Withdraw { user, currency, cents }),
        (user.clone(), currency.clone(), currency.clone(), cents.clone())
            .prop_map(|(user, from, to, cents)| Op::Convert { user, from, to, cents }),
        (user.clone(), user, currency.clone(), currency, cents)
            .prop_map(|(user, to_user, from, to, cents)| Op::Transfer { user, to_user, from, to, cents }),
    ]
}

/// Ledger with two users and USD/EUR quoted against ILS
fn seeded_ledger() -> (Ledger, [UserId; 2], [&'static str; 2]) {
    let store = Store::new_in_memory().unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    store.rates().upsert(&code("USD"), &code("ILS"), day, Decimal::new(370, 2)).unwrap();
    store.rates().upsert(&code("EUR"), &code("ILS"), day, Decimal::new(400, 2)).unwrap();
    let a = store.users().create("a@example.com", None).unwrap().id;
    let b = store.users().create("b@example.com", None).unwrap().id;
    (Ledger::new(store, code("ILS")), [a, b], ["a@example.com", "b@example.com"])
}

fn snapshot(ledger: &Ledger, users: &[UserId; 2]) -> Vec<Decimal> {
    let mut balances = Vec::new();
    for user in users {
        for currency in CURRENCIES {
            balances.push(ledger.balance(*user, &code(currency)).unwrap().unwrap_or(Decimal::ZERO));
        }
    }
    balances
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn prop_balances_never_negative(ops in proptest::collection::vec(arb_op(), 1..40)) {
        let (mut ledger, users, emails) = seeded_ledger();

        for op in ops {
            let before = snapshot(&ledger, &users);
            let rows_before = ledger.store().transactions().count().unwrap();

            let result = match op {
                Op::Deposit { user, currency, cents } => ledger
                    .deposit(users[user], &code(CURRENCIES[currency]), Decimal::new(cents, 2))
                    .map(|_| ()),
                Op::Withdraw { user, currency, cents } => ledger
                    .withdraw(users[user], &code(CURRENCIES[currency]), Decimal::new(cents, 2))
                    .map(|_| ()),
                Op::Convert { user, from, to, cents } => ledger
                    .convert(users[user], &code(CURRENCIES[from]), &code(CURRENCIES[to]), Decimal::new(cents, 2))
                    .map(|_| ()),
                Op::Transfer { user, to_user, from, to, cents } => ledger
                    .transfer(users[user], emails[to_user], &code(CURRENCIES[from]), &code(CURRENCIES[to]), Decimal::new(cents, 2))
                    .map(|_| ()),
            };

            let after = snapshot(&ledger, &users);
            for balance in &after {
                prop_assert!(*balance >= Decimal::ZERO, "negative balance {}", balance);
            }
            if let Err(e) = result {
                prop_assert!(e.is_rejection(), "unexpected failure {}", e);
                prop_assert_eq!(&before, &after);
                prop_assert_eq!(ledger.store().transactions().count().unwrap(), rows_before);
            }
        }
    }

    #[test]
    fn prop_convert_conserves(deposit in 1..1_000_000i64, spend in 1..1_000_000i64, from in 0..2usize, to in 0..2usize) {
        prop_assume!(from != to);
        let (mut ledger, users, _) = seeded_ledger();
        let (from, to) = (code(CURRENCIES[from]), code(CURRENCIES[to]));
        let user = users[0];
        ledger.deposit(user, &from, Decimal::new(deposit, 2)).unwrap();

        let from_before = ledger.balance(user, &from).unwrap().unwrap_or(Decimal::ZERO);
        let to_before = ledger.balance(user, &to).unwrap().unwrap_or(Decimal::ZERO);
        let amount = Decimal::new(spend, 2);

        match ledger.convert(user, &from, &to, amount) {
            Ok(outcome) => {
                let credited = round_money(amount * outcome.rate, 2);
                prop_assert_eq!(outcome.from_balance, from_before - amount);
                prop_assert_eq!(outcome.to_balance, to_before + credited);
                prop_assert_eq!(outcome.converted_amount, credited);
            }
            Err(LedgerError::InsufficientFunds { available, .. }) => {
                prop_assert!(amount > from_before);
                prop_assert_eq!(available, from_before);
            }
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }

    #[test]
    fn prop_transfer_writes_two_rows(spend in 1..10_000i64, from in 0..3usize, to in 0..3usize) {
        let (mut ledger, users, emails) = seeded_ledger();
        let (from, to) = (code(CURRENCIES[from]), code(CURRENCIES[to]));
        ledger.deposit(users[0], &from, Decimal::new(10_000, 2)).unwrap();
        let rows = ledger.store().transactions().count().unwrap();
        let amount = Decimal::new(spend, 2);

        match ledger.transfer(users[0], emails[1], &from, &to, amount) {
            Ok(outcome) => {
                prop_assert_eq!(ledger.store().transactions().count().unwrap(), rows + 2);
                prop_assert_eq!(outcome.from_new_balance, Decimal::new(10_000, 2) - amount);
                prop_assert_eq!(ledger.balance(users[1], &to).unwrap(), Some(outcome.converted_amount));
            }
            Err(e) => {
                // Only dust amounts that round to nothing in the target currency
                prop_assert_eq!(e.kind(), "invalid_amount");
                prop_assert_eq!(ledger.store().transactions().count().unwrap(), rows);
            }
        }
    }
}
