use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::errors::AppError;
use crate::models::{Order, WholesaleRequest};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_str() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Users ──

pub fn upsert_user(
    conn: &Connection,
    id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO users (id, username, first_name, last_name, last_activity)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
           username = excluded.username,
           first_name = excluded.first_name,
           last_name = excluded.last_name,
           last_activity = excluded.last_activity",
        params![id, username, first_name, last_name, now_str()],
    )?;
    Ok(())
}

pub fn count_users(conn: &Connection) -> Result<i64, AppError> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

/// All known users, for broadcast fan-out: (id, username, first_name).
pub fn list_users(
    conn: &Connection,
) -> Result<Vec<(i64, Option<String>, Option<String>)>, AppError> {
    let mut stmt = conn.prepare("SELECT id, username, first_name FROM users")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;

    let mut users = vec![];
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

// ── Orders ──

pub fn insert_order(conn: &Connection, order: &Order) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO orders (id, user_id, username, customer_name, contact, item_id, item_name, item_price, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            order.id,
            order.user_id,
            order.username,
            order.customer_name,
            order.contact,
            order.item_id,
            order.item_name,
            order.item_price,
            order.status,
            order.created_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn count_orders(conn: &Connection) -> Result<i64, AppError> {
    let count = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
    Ok(count)
}

pub fn list_orders(conn: &Connection, limit: i64) -> Result<Vec<Order>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, username, customer_name, contact, item_id, item_name, item_price, status, created_at
         FROM orders ORDER BY created_at DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        let created_at: String = row.get(9)?;
        Ok(Order {
            id: row.get(0)?,
            user_id: row.get(1)?,
            username: row.get(2)?,
            customer_name: row.get(3)?,
            contact: row.get(4)?,
            item_id: row.get(5)?,
            item_name: row.get(6)?,
            item_price: row.get(7)?,
            status: row.get(8)?,
            created_at: parse_ts(&created_at),
        })
    })?;

    let mut orders = vec![];
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}

// ── Wholesale Requests ──

pub fn insert_wholesale_request(
    conn: &Connection,
    request: &WholesaleRequest,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO wholesale_requests (id, user_id, username, request_text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            request.id,
            request.user_id,
            request.username,
            request.request_text,
            request.created_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn list_wholesale_requests(
    conn: &Connection,
    limit: i64,
) -> Result<Vec<WholesaleRequest>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, username, request_text, created_at
         FROM wholesale_requests ORDER BY created_at DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        let created_at: String = row.get(4)?;
        Ok(WholesaleRequest {
            id: row.get(0)?,
            user_id: row.get(1)?,
            username: row.get(2)?,
            request_text: row.get(3)?,
            created_at: parse_ts(&created_at),
        })
    })?;

    let mut requests = vec![];
    for row in rows {
        requests.push(row?);
    }
    Ok(requests)
}
