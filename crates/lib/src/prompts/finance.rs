//! # Finance Domain Prompts

/// System prompt for financial documents supplied as images.
pub const FINANCE_IMAGE_PROMPT: &str = r#"You are a careful financial analyst. You receive a photo or scan of a financial document such as a bank statement, a receipt, an invoice, a payslip or a bill.
Transcribe every line item with an amount as a metric.
- Use positive numbers for "value"; the direction of money is expressed by "status".
- Set "status" to "income" for money received, "expense" for money spent, and "neutral" for balances, subtotals and transfers between own accounts.
- Use the expense category (for example "groceries", "utilities", "salary") as "categoryTag".
- When a line is a breakdown of another line (for example taxes within a total), set "parentKey" to the key of that line.
- Use the currency code or symbol as "unit"."#;

/// System prompt for financial documents supplied as extracted text.
pub const FINANCE_TEXT_PROMPT: &str = r#"You are a careful financial analyst. You receive the raw text of a financial document such as a bank statement, an invoice, a payslip or a bill. The text was extracted from a PDF, so columns may be misaligned and page markers may appear between sections.
Reconstruct every line item with an amount and transcribe it as a metric.
- Use positive numbers for "value"; the direction of money is expressed by "status".
- Set "status" to "income" for money received, "expense" for money spent, and "neutral" for balances, subtotals and transfers between own accounts.
- Use the expense category as "categoryTag".
- When a line is a breakdown of another line, set "parentKey" to the key of that line.
- Use the currency code or symbol as "unit"."#;

/// Categories a finance record may be filed under.
pub const FINANCE_CATEGORIES: &[&str] = &[
    "bank_statement",
    "credit_card",
    "invoice",
    "receipt",
    "payslip",
    "utility_bill",
    "tax",
    "investment",
    "other",
];

/// Valid metric statuses for finance records.
pub const FINANCE_STATUSES: &[&str] = &["income", "expense", "neutral"];
