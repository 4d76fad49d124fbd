//! Agent profile definitions and question routing.
//!
//! One parameterized profile type replaces what would otherwise be
//! copy-pasted per-dataset agent definitions: each profile carries its table,
//! column documentation, and the product names it is responsible for.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnDoc {
    pub name: String,
    pub sql_type: String,
    pub description: String,
}

impl ColumnDoc {
    pub fn new(
        name: impl Into<String>,
        sql_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), sql_type: sql_type.into(), description: description.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    pub name: String,
    pub description: String,
    pub table: String,
    pub columns: Vec<ColumnDoc>,
    pub products: Vec<String>,
    pub calendar_enabled: bool,
}

impl AgentProfile {
    /// Monthly retail sales profile (ten consumer products, revenue by month).
    pub fn retail_sales(table: &str) -> Self {
        Self {
            name: "sales_agent".to_string(),
            description: "Answer questions about retail sales data from the warehouse"
                .to_string(),
            table: table.to_string(),
            columns: vec![
                ColumnDoc::new(
                    "Date",
                    "DATE",
                    "The first day of the month for sales data (e.g., '2023-01-01')",
                ),
                ColumnDoc::new(
                    "ProductId",
                    "STRING",
                    "Unique identifier for a product (e.g., 'P01', 'P02')",
                ),
                ColumnDoc::new(
                    "ProductName",
                    "STRING",
                    "Name of the product (e.g., 'Basic T-Shirt', 'Wireless Headphones')",
                ),
                ColumnDoc::new(
                    "SalesRevenue",
                    "NUMERIC",
                    "Total sales revenue for the month for this product",
                ),
            ],
            products: [
                "Basic T-Shirt",
                "Camping Tent",
                "Coffee Maker",
                "Cookware Set",
                "Denim Jeans",
                "Novelty Mug",
                "Running Shoes",
                "Smartwatch",
                "Weighted Blanket",
                "Wireless Headphones",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            calendar_enabled: false,
        }
    }

    /// Weekly promo profile (promoted product groups with promotion flags).
    /// Owns the calendar tools: promotion planning is a scheduling exercise.
    pub fn promo(table: &str) -> Self {
        Self {
            name: "promo_agent".to_string(),
            description:
                "Suggest promotion strategy based on weekly sales data and manage the calendar"
                    .to_string(),
            table: table.to_string(),
            columns: vec![
                ColumnDoc::new(
                    "date",
                    "DATE",
                    "The first day of the week for sales data (e.g., '2023-01-03')",
                ),
                ColumnDoc::new(
                    "retailer_banner_geography",
                    "STRING",
                    "Geographic identifier of the retailer (e.g., 'NORTH EAST')",
                ),
                ColumnDoc::new(
                    "promoted_group",
                    "STRING",
                    "The name of a product (e.g., 'FACE CREAM')",
                ),
                ColumnDoc::new(
                    "daily_weekly_value_sales",
                    "FLOAT",
                    "Total sales revenue for the week of a given product",
                ),
                ColumnDoc::new(
                    "is_tpr",
                    "INTEGER",
                    "Temporary Price Reduction flag: 1 if the product was on TPR, else 0",
                ),
                ColumnDoc::new(
                    "is_feature",
                    "INTEGER",
                    "Magazine feature flag: 1 if the product was promoted in a magazine, else 0",
                ),
                ColumnDoc::new(
                    "is_display",
                    "INTEGER",
                    "Display flag: 1 if the product was promoted on display, else 0",
                ),
            ],
            products: ["FACE CREAM", "MOISTURISER"].into_iter().map(str::to_string).collect(),
            calendar_enabled: true,
        }
    }

    pub fn mentions_product(&self, question: &str) -> bool {
        let question = question.to_lowercase();
        self.products.iter().any(|product| question.contains(&product.to_lowercase()))
    }

    /// Schema context handed to the LLM as the system instruction.
    pub fn instruction(&self) -> String {
        let mut out = String::new();
        out.push_str("You have access to the following warehouse table:\n");
        out.push_str(&format!("Table: `{}`\n\nColumns:\n", self.table));
        for column in &self.columns {
            out.push_str(&format!(
                "  - `{}` ({}): {}.\n",
                column.name, column.sql_type, column.description
            ));
        }
        out.push_str(&format!(
            "\nGuidelines for generating SQL:\n\
             1. Always use the fully qualified table name: `{}`.\n\
             2. For date filtering, use date functions such as `DATE()`, `strftime`, or plain ISO date comparisons.\n\
             3. If a question asks for \"total\" or \"sum\", use `SUM()`.\n\
             4. If a question asks for \"average\", use `AVG()`.\n\
             5. If a question asks for \"count\", use `COUNT()`.\n\
             6. If a question asks for \"top\" or \"highest\", use `ORDER BY` and `LIMIT`.\n\
             7. Always `GROUP BY` and `ORDER BY` appropriately when using aggregate functions.\n\
             8. Assume the question is about revenue if no measure is specified.\n\
             9. Consider the user's question, and respond concisely based on the query results.\n\
             10. If the query result is empty, clearly state that no data was found.\n",
            self.table
        ));

        if self.calendar_enabled {
            out.push_str(
                "\nYou can also manage the calendar: use `create_calendar_event` and \
                 `list_upcoming_events`.\n\
                 - When creating events, gather summary, start time, and end time first.\n\
                 - Dates and times use ISO 8601 (\"YYYY-MM-DDTHH:MM:SS\" or \"YYYY-MM-DD\").\n\
                 - Assume event times are in UTC unless specified.\n",
            );
        }

        out
    }
}

/// Static product-name dispatch between profiles. The first profile is the
/// fallback when nothing matches.
#[derive(Clone, Debug)]
pub struct ProfileRouter {
    profiles: Vec<AgentProfile>,
}

const CALENDAR_KEYWORDS: &[&str] = &["calendar", "event", "meeting", "schedule", "reminder"];

impl ProfileRouter {
    pub fn new(profiles: Vec<AgentProfile>) -> Self {
        debug_assert!(!profiles.is_empty(), "router requires at least one profile");
        Self { profiles }
    }

    pub fn profiles(&self) -> &[AgentProfile] {
        &self.profiles
    }

    pub fn route(&self, question: &str) -> &AgentProfile {
        if let Some(profile) =
            self.profiles.iter().find(|profile| profile.mentions_product(question))
        {
            return profile;
        }

        let lowered = question.to_lowercase();
        if CALENDAR_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
            if let Some(profile) = self.profiles.iter().find(|profile| profile.calendar_enabled) {
                return profile;
            }
        }

        &self.profiles[0]
    }
}
