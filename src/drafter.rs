use crate::resolver::InvoiceRecord;

/// A rendered reply. Never persisted; only displayed and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEmail {
    pub subject: String,
    pub body: String,
}

/// Render the reply for one detected invoice. Pure function of its inputs:
/// identical arguments always produce the identical draft.
///
/// The vendor email rides along for callers that address the reply; the
/// templates themselves only use the display name.
pub fn draft_email(
    vendor_name: &str,
    _vendor_email: Option<&str>,
    invoice_no: &str,
    record: Option<&InvoiceRecord>,
) -> DraftEmail {
    let name = if vendor_name.is_empty() {
        "Team"
    } else {
        vendor_name
    };
    let subject = format!("Re: Payment Inquiry – {invoice_no}");

    let Some(record) = record else {
        let body = format!(
            "Hi {name},\n\n\
             Thanks for reaching out. We couldn't find invoice {invoice_no} in our records. \
             Could you please confirm the invoice number, amount, and date, or attach the invoice copy?\n\n\
             Regards,\nAccounts Payable"
        );
        return DraftEmail { subject, body };
    };

    let status = title_case(record.status.as_deref().unwrap_or(""));

    let mut details: Vec<String> = Vec::new();
    if let Some(amount) = non_empty(record.total_invoice_amount.as_deref()) {
        let currency = non_empty(record.currency.as_deref()).unwrap_or("USD");
        details.push(format!("Amount: {currency} {amount}"));
    }
    let invoice_date = non_empty(record.invoice_date.as_deref())
        .or_else(|| non_empty(record.supplier_invoice_date.as_deref()));
    if let Some(date) = invoice_date {
        details.push(format!("Invoice Date: {date}"));
    }
    if let Some(comments) = non_empty(record.comments.as_deref()) {
        details.push(format!("Notes: {comments}"));
    }

    let mut body = format!("Hi {name},\n\nHere's the status for invoice {invoice_no}: {status}.\n");
    if !details.is_empty() {
        body.push('\n');
        for detail in &details {
            body.push_str(&format!("- {detail}\n"));
        }
    }

    match status.as_str() {
        "Paid" => {
            body.push_str("\nIf you haven't received the remittance advice, let us know and we'll resend.");
        }
        "Queued" | "Processing" => {
            body.push_str("\nWe expect completion soon; we'll notify you once it posts.");
        }
        "On Hold" => {
            body.push_str("\nThis is pending additional review. We'll reach out if we need anything further.");
        }
        "Rejected" | "Unpaid" => {
            body.push_str("\nPlease review the details above and let us know if any corrections are needed.");
        }
        _ => {}
    }
    body.push_str("\n\nRegards,\nAccounts Payable");

    DraftEmail { subject, body }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Upper-case the first letter of every alphabetic run, lower-case the
/// rest, with any non-letter acting as a word boundary ("on HOLD" ->
/// "On Hold").
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
