//! Built-in CRM schema and sample data.
//!
//! Every seeded table has a unique natural key, so loading the sample rows a
//! second time only produces duplicates that get skipped. Foreign identifiers
//! in the rows assume a freshly created database where serial ids start at 1.

use serde_json::{Value, json};

use crate::libs::schema::{ColumnSpec, ColumnType, OnDelete, TableDefinition};
use crate::libs::seed::SeedRow;

fn varchar(name: &str, length: u16) -> ColumnSpec {
    ColumnSpec::new(name, ColumnType::Varchar { length })
}

fn money(name: &str) -> ColumnSpec {
    ColumnSpec::new(
        name,
        ColumnType::Decimal {
            precision: 12,
            scale: 2,
        },
    )
}

fn created_at() -> ColumnSpec {
    ColumnSpec::new("created_at", ColumnType::Timestamp)
        .not_null()
        .default_sql("CURRENT_TIMESTAMP")
}

pub fn definitions() -> Vec<TableDefinition> {
    vec![
        TableDefinition::new("users")
            .column(ColumnSpec::id("id"))
            .column(varchar("name", 100).not_null())
            .column(varchar("email", 191).not_null().unique())
            .column(varchar("password_hash", 255).not_null())
            .column(varchar("role", 32).not_null().default_sql("'sales'"))
            .column(ColumnSpec::new("active", ColumnType::Boolean).not_null().default_sql("TRUE"))
            .column(created_at()),
        TableDefinition::new("clients")
            .column(ColumnSpec::id("id"))
            .column(varchar("company_name", 150).not_null())
            .column(varchar("contact_name", 100))
            .column(varchar("email", 191).not_null().unique())
            .column(varchar("phone", 32))
            .column(ColumnSpec::new("address", ColumnType::Text))
            .column(ColumnSpec::new("account_manager_id", ColumnType::Integer))
            .column(created_at())
            .foreign_key("account_manager_id", "users", "id", OnDelete::SetNull),
        TableDefinition::new("pipelines")
            .column(ColumnSpec::id("id"))
            .column(varchar("name", 100).not_null().unique())
            .column(ColumnSpec::new("description", ColumnType::Text))
            .column(created_at()),
        TableDefinition::new("pipeline_stages")
            .column(ColumnSpec::id("id"))
            .column(ColumnSpec::new("pipeline_id", ColumnType::Integer).not_null())
            .column(varchar("name", 100).not_null())
            .column(ColumnSpec::new("position", ColumnType::Integer).not_null())
            .column(ColumnSpec::new("win_probability", ColumnType::Integer).default_sql("0"))
            .foreign_key("pipeline_id", "pipelines", "id", OnDelete::Cascade)
            .index("pipeline_stages_pipeline_name_uq", &["pipeline_id", "name"], true),
        TableDefinition::new("leads")
            .column(ColumnSpec::id("id"))
            .column(varchar("name", 100).not_null())
            .column(varchar("email", 191).not_null().unique())
            .column(varchar("phone", 32))
            .column(varchar("source", 50))
            .column(varchar("status", 32).not_null().default_sql("'new'"))
            .column(money("estimated_value"))
            .column(ColumnSpec::new("owner_id", ColumnType::Integer))
            .column(ColumnSpec::new("stage_id", ColumnType::Integer))
            .column(ColumnSpec::new("client_id", ColumnType::Integer))
            .column(created_at())
            .foreign_key("owner_id", "users", "id", OnDelete::SetNull)
            .foreign_key("stage_id", "pipeline_stages", "id", OnDelete::SetNull)
            .foreign_key("client_id", "clients", "id", OnDelete::SetNull)
            .index("leads_status_idx", &["status"], false),
        TableDefinition::new("contracts")
            .column(ColumnSpec::id("id"))
            .column(ColumnSpec::new("reference", ColumnType::Uuid).not_null().auto_uuid())
            .column(varchar("contract_number", 64).not_null().unique())
            .column(ColumnSpec::new("client_id", ColumnType::Integer).not_null())
            .column(varchar("title", 150).not_null())
            .column(money("amount").not_null())
            .column(ColumnSpec::new("start_date", ColumnType::Date).not_null())
            .column(ColumnSpec::new("end_date", ColumnType::Date))
            .column(varchar("status", 32).not_null().default_sql("'draft'"))
            .column(created_at())
            .foreign_key("client_id", "clients", "id", OnDelete::Cascade),
        TableDefinition::new("payments")
            .column(ColumnSpec::id("id"))
            .column(varchar("reference", 64).not_null().unique())
            .column(ColumnSpec::new("contract_id", ColumnType::Integer).not_null())
            .column(money("amount").not_null())
            .column(ColumnSpec::new("paid_on", ColumnType::Date).not_null())
            .column(varchar("method", 32))
            .column(created_at())
            .foreign_key("contract_id", "contracts", "id", OnDelete::Cascade)
            .index("payments_contract_idx", &["contract_id"], false),
        TableDefinition::new("activities")
            .column(ColumnSpec::id("id"))
            .column(ColumnSpec::new("lead_id", ColumnType::Integer))
            .column(ColumnSpec::new("user_id", ColumnType::Integer))
            .column(varchar("kind", 32).not_null())
            .column(ColumnSpec::new("notes", ColumnType::Text))
            .column(ColumnSpec::new("due_at", ColumnType::Timestamp))
            .column(created_at())
            .foreign_key("lead_id", "leads", "id", OnDelete::Cascade)
            .foreign_key("user_id", "users", "id", OnDelete::SetNull),
    ]
}

fn row(table: &str, values: Value) -> SeedRow {
    let Value::Object(values) = values else {
        unreachable!("catalog rows are object literals");
    };
    SeedRow::new(table, values)
}

pub fn seeds() -> Vec<SeedRow> {
    let mut rows = vec![
        row(
            "users",
            json!({"name": "Admin", "email": "admin@crm.local", "password_hash": "$2y$10$seedadminhash", "role": "admin"}),
        )
        .keyed_by(&["email"]),
        row(
            "users",
            json!({"name": "Sam Seller", "email": "sam@crm.local", "password_hash": "$2y$10$seedsalehash"}),
        )
        .keyed_by(&["email"]),
        row(
            "clients",
            json!({"company_name": "Acme Corp", "contact_name": "Alice Doe", "email": "alice@acme.test", "phone": "+1-555-0100", "account_manager_id": 2}),
        )
        .keyed_by(&["email"]),
        row(
            "clients",
            json!({"company_name": "Globex", "contact_name": "Bob Roe", "email": "bob@globex.test", "account_manager_id": 2}),
        )
        .keyed_by(&["email"]),
        row(
            "pipelines",
            json!({"name": "Sales", "description": "Default sales pipeline"}),
        )
        .keyed_by(&["name"]),
    ];

    for (position, (stage, probability)) in [
        ("Prospecting", 10),
        ("Qualified", 30),
        ("Proposal", 60),
        ("Negotiation", 80),
        ("Closed Won", 100),
    ]
    .into_iter()
    .enumerate()
    {
        rows.push(
            row(
                "pipeline_stages",
                json!({"pipeline_id": 1, "name": stage, "position": position + 1, "win_probability": probability}),
            )
            .keyed_by(&["pipeline_id", "name"]),
        );
    }

    rows.extend([
        row(
            "leads",
            json!({"name": "Carol Smith", "email": "carol@initech.test", "source": "website", "estimated_value": 5000.0, "owner_id": 2, "stage_id": 1}),
        )
        .keyed_by(&["email"]),
        row(
            "leads",
            json!({"name": "Dan Brown", "email": "dan@umbrella.test", "source": "referral", "status": "qualified", "estimated_value": 12000.0, "owner_id": 2, "stage_id": 2, "client_id": 1}),
        )
        .keyed_by(&["email"]),
        row(
            "contracts",
            json!({"contract_number": "CT-2024-0001", "client_id": 1, "title": "Annual support", "amount": 24000.0, "start_date": "2024-01-01", "end_date": "2024-12-31", "status": "active"}),
        )
        .keyed_by(&["contract_number"]),
        row(
            "payments",
            json!({"reference": "PAY-0001", "contract_id": 1, "amount": 6000.0, "paid_on": "2024-01-15", "method": "bank_transfer"}),
        )
        .keyed_by(&["reference"]),
        row(
            "payments",
            json!({"reference": "PAY-0002", "contract_id": 1, "amount": 6000.0, "paid_on": "2024-04-15", "method": "bank_transfer"}),
        )
        .keyed_by(&["reference"]),
    ]);

    rows
}
