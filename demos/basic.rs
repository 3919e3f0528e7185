//! Basic example demonstrating CouchDB Rust SDK usage.
//!
//! Reads connection settings from `COUCHDB_*` environment variables.

use couchdb::{ConnectOptions, Connection, Members, Security};
use serde_json::json;

#[tokio::main]
async fn main() -> couchdb::Result<()> {
  // Connect to the CouchDB server
  let conn = Connection::with_options(ConnectOptions::from_env()?)?;
  conn.ping().await?;
  let info = conn.info().await?;
  println!("Connected to CouchDB {}", info.version);

  // List databases
  let dbs = conn.get_db_list().await?;
  println!("Databases: {:?}", dbs);

  // Create a database
  conn.create_db("orders", None).await?;
  let db = conn.select_db("orders");

  // Insert a document; "" means it does not exist yet
  let rev = db.save(&json!({"item": "pen", "qty": 2}), "o1", "").await?;
  println!("Saved o1 at {}", rev);

  // Update it with the current revision
  let rev = db.save(&json!({"item": "pen", "qty": 3}), "o1", &rev).await?;
  println!("Updated o1 to {}", rev);

  // Attach a receipt
  let rev = db
    .save_attachment("o1", &rev, "receipt.txt", "text/plain", "paid in full")
    .await?;
  let receipt = db.get_attachment("o1", &rev, "text/plain", "receipt.txt").await?;
  println!("Receipt: {:?}", receipt.bytes().await?);

  // Read it back
  let (doc, current): (serde_json::Value, String) = db.read("o1").await?;
  println!("Read o1 at {}: {}", current, doc);

  // Restrict access
  db.save_security(&Security {
    members: Members {
      names: vec![],
      roles: vec!["sales".to_string()],
    },
    admins: Members::default(),
  })
  .await?;

  // Clean up
  let deleted = db.delete("o1", &current).await?;
  println!("Deleted o1 at {}", deleted);
  conn.delete_db("orders", None).await?;

  Ok(())
}
