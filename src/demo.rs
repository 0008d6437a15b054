use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::extract::{MessagePart, PartBody, RawMessage};

/// Deterministic sample alerts exercising every pipeline path: each issuer
/// template, the generic fallback, a credit, and noise that must be dropped.
/// Timestamps are fixed so demo runs are reproducible.
pub fn sample_messages() -> Vec<RawMessage> {
    let samples: &[(&str, &str, &str, i64)] = &[
        (
            "demo-sbi-1",
            "SBI Card transaction alert",
            "Rs.1,250.50 spent on your SBI Credit Card ending 3183 at BIG BAZAAR on 05-01-24",
            1_704_430_800_000,
        ),
        (
            "demo-hdfc-1",
            "HDFC Bank alert",
            "Rs. 450.00 has been debited from your HDFC Bank A/c XX3044 to SWIGGY on 05-01-24",
            1_704_434_400_000,
        ),
        (
            "demo-axis-1",
            "Axis Bank transaction",
            "INR 212.00 debited from A/c no. XX4521 on 05-01-24 14:02:11 Info: UPI/P2M/400123456789/BLINKIT. Avl bal INR 9,120.44",
            1_704_438_000_000,
        ),
        (
            "demo-icici-1",
            "ICICI Bank Card alert",
            "Your ICICI Bank Credit Card XX9012 has been used for a transaction of INR 2,499.00 on 05-Jan-24 at AMAZON PAY. Info: online purchase.",
            1_704_441_600_000,
        ),
        (
            "demo-generic-1",
            "Payment confirmation",
            "Payment of Rs. 2,000 made to HPCL FUEL STATION via UPI. Ref 4029.",
            1_704_445_200_000,
        ),
        (
            "demo-credit-1",
            "Refund processed",
            "Refund of Rs. 599.00 credited to your card ending 3183 for order cancellation at MYNTRA",
            1_704_448_800_000,
        ),
        (
            "demo-noise-otp",
            "Verification code",
            "Your OTP is 4821. Do not share. Rs. 500 will be used to verify.",
            1_704_452_400_000,
        ),
        (
            "demo-noise-declined",
            "Transaction declined",
            "Transaction of Rs. 1,200 at ABC STORE was declined due to insufficient funds.",
            1_704_456_000_000,
        ),
        (
            "demo-bill-1",
            "Card statement",
            "Your credit card bill of Rs. 4,520.00 is due on 15-Jan-2024. Pay before the due date to avoid charges.",
            1_704_459_600_000,
        ),
    ];

    samples
        .iter()
        .map(|(id, subject, body, millis)| RawMessage {
            id: id.to_string(),
            from: "alerts@bank.example".to_string(),
            subject: subject.to_string(),
            internal_date: Some(*millis),
            payload: Some(MessagePart {
                mime_type: "text/plain".to_string(),
                body: Some(PartBody {
                    data: Some(URL_SAFE_NO_PAD.encode(body)),
                }),
                parts: Vec::new(),
            }),
            ..Default::default()
        })
        .collect()
}
