//! Simulated customer-support data for the Tollgate reference deployment.
//!
//! All data in this module is hardcoded and fictional. The SSNs use the
//! never-issued 9xx area, and the card numbers are public test numbers.
//! Each record deliberately carries the fields the reference policy blocks
//! (`ssn`, `credit_card`, `password`) so redaction has something to do.

use serde_json::{json, Value};

// ── Customers (mock) ──────────────────────────────────────────────────────────

/// One fictional customer account.
#[derive(Debug, Clone, Copy)]
pub struct Customer {
    pub id: &'static str,
    pub name: &'static str,
    pub email: &'static str,
    pub ssn: &'static str,
    pub credit_card: &'static str,
    pub password: &'static str,
    pub plan: &'static str,
}

pub const CUSTOMERS: [Customer; 3] = [
    Customer {
        id: "42",
        name: "Alice Chen",
        email: "alice.chen@example.com",
        ssn: "900-12-3456",
        credit_card: "4111 1111 1111 1111",
        password: "tulip-Garden-77",
        plan: "premium",
    },
    Customer {
        id: "99",
        name: "Bob Martinez",
        email: "bob.martinez@example.com",
        ssn: "900-98-7654",
        credit_card: "5555-5555-5555-4444",
        password: "harbor#Light3",
        plan: "standard",
    },
    Customer {
        id: "7",
        name: "Carol Nguyen",
        email: "carol.nguyen@example.com",
        ssn: "900-55-0007",
        credit_card: "378282246310005",
        password: "quiet.River.19",
        plan: "standard",
    },
];

/// Look up a customer by id.
pub fn customer(id: &str) -> Option<&'static Customer> {
    CUSTOMERS.iter().find(|c| c.id == id)
}

// ── Orders (mock) ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub id: &'static str,
    pub customer_id: &'static str,
    pub product_id: &'static str,
    pub amount: f64,
    pub status: &'static str,
}

pub const ORDERS: [Order; 4] = [
    Order { id: "12345", customer_id: "42", product_id: "PROD-001", amount: 29.99, status: "shipped" },
    Order { id: "67890", customer_id: "42", product_id: "PROD-002", amount: 49.99, status: "delivered" },
    Order { id: "24680", customer_id: "99", product_id: "PROD-003", amount: 199.99, status: "processing" },
    Order { id: "13579", customer_id: "7", product_id: "PROD-001", amount: 29.99, status: "delivered" },
];

pub fn order(id: &str) -> Option<&'static Order> {
    ORDERS.iter().find(|o| o.id == id)
}

/// The full account record for `customer`, blocked fields included.
pub fn customer_record(customer: &Customer) -> Value {
    let orders: Vec<Value> = ORDERS
        .iter()
        .filter(|o| o.customer_id == customer.id)
        .map(|o| {
            json!({
                "order_id": o.id,
                "product_id": o.product_id,
                "amount": o.amount,
                "status": o.status
            })
        })
        .collect();

    json!({
        "customer_id": customer.id,
        "name": customer.name,
        "email": customer.email,
        "plan": customer.plan,
        "ssn": customer.ssn,
        "credit_card": customer.credit_card,
        "password": customer.password,
        "orders": orders
    })
}

/// Every customer as flat text rows, the way a raw SQL client prints them.
pub fn customer_table() -> String {
    CUSTOMERS
        .iter()
        .map(|c| {
            format!(
                "id={} name={} email={} ssn={} credit_card={} password={}",
                c.id, c.name, c.email, c.ssn, c.credit_card, c.password
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Inventory (mock) ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Product {
    pub id: &'static str,
    pub name: &'static str,
    pub stock: u32,
    pub price: f64,
}

pub const INVENTORY: [Product; 3] = [
    Product { id: "PROD-001", name: "Widget Pro", stock: 150, price: 29.99 },
    Product { id: "PROD-002", name: "Gadget Plus", stock: 75, price: 49.99 },
    Product { id: "PROD-003", name: "Tech Bundle", stock: 25, price: 99.99 },
];

/// Look up a product by id (`PROD-001`) or by name, case-insensitively.
pub fn product(key: &str) -> Option<&'static Product> {
    INVENTORY
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(key) || p.name.eq_ignore_ascii_case(key))
}
