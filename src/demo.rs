//! Sample dataset loaded when a session starts without a user file

/// Three related tables with a handful of rows each
pub const SEED_SQL: &str = "
CREATE TABLE customers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email VARCHAR(255) UNIQUE,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    joined_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE products (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    price REAL NOT NULL,
    stock INTEGER NOT NULL DEFAULT 0,
    thumbnail BLOB
);

CREATE TABLE orders (
    id INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    product_id INTEGER NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL,
    total NUMERIC,
    ordered_on DATE NOT NULL
);

CREATE INDEX idx_orders_customer ON orders(customer_id);

INSERT INTO customers (id, name, email, is_active, joined_at) VALUES
    (1, 'Alice Martin', 'alice@example.com', 1, '2023-01-14 09:12:00'),
    (2, 'Bob Chen', 'bob@example.com', 1, '2023-02-02 17:45:10'),
    (3, 'Carla Diaz', NULL, 0, '2023-03-21 08:00:00'),
    (4, 'Dmitri Ivanov', 'dmitri@example.com', 1, '2023-05-30 12:30:45');

INSERT INTO products (id, name, price, stock, thumbnail) VALUES
    (1, 'Mechanical keyboard', 89.99, 12, X'89504E470D0A1A0A'),
    (2, 'USB-C cable, 2m', 9.5, 140, NULL),
    (3, 'Monitor arm', 45.0, 0, X'FFD8FFE0');

INSERT INTO orders (id, customer_id, product_id, quantity, total, ordered_on) VALUES
    (1, 1, 1, 1, 89.99, '2024-01-05'),
    (2, 1, 2, 3, 28.5, '2024-01-05'),
    (3, 2, 3, 1, 45.0, '2024-02-11'),
    (4, 4, 2, 2, 19.0, '2024-03-18'),
    (5, 2, 1, 1, 89.99, '2024-04-01');
";

/// Table selected by default in the demo dataset
pub const DEFAULT_TABLE: &str = "customers";
