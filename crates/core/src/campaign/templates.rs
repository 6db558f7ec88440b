//! Plain-text message bodies for the three campaign kinds.

use crate::domain::ItemId;

pub(crate) fn discount_body(
    customer_name: &str,
    product: &str,
    discount_percent: u32,
    valid_until: &str,
) -> String {
    format!(
        "Dear {customer_name},

We have an exclusive offer just for you!

🎉 Get {discount_percent}% OFF on {product}!

This special offer is valid until {valid_until}.

Don't miss out on this amazing deal - shop now and save!

Best regards,
Your Grocery Store Team

---
This email was sent because you're a valued customer.
If you wish to unsubscribe, please reply with 'UNSUBSCRIBE'."
    )
}

pub(crate) fn voucher_body(customer_name: &str, voucher_amount: u32, valid_until: &str) -> String {
    format!(
        "Dear {customer_name},

You've been selected for a special reward!

💰 ${voucher_amount} Shopping Voucher

Use this voucher for your next purchase. Valid until {valid_until}.

We appreciate your loyalty and hope to see you soon!

Best regards,
Your Grocery Store Team

---
This email was sent because you're a valued customer.
If you wish to unsubscribe, please reply with 'UNSUBSCRIBE'."
    )
}

pub(crate) fn recommendation_body(customer_name: &str, products: &[ItemId]) -> String {
    let product_list: Vec<String> =
        products.iter().map(|product| format!("• {product}")).collect();
    let product_list = product_list.join("\n");

    format!(
        "Dear {customer_name},

Based on your shopping history, we think you might like these products:

{product_list}

Visit our store to discover these and many more great products!

Best regards,
Your Grocery Store Team

---
This email was sent because you're a valued customer.
If you wish to unsubscribe, please reply with 'UNSUBSCRIBE'."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_body_carries_offer_and_deadline() {
        let body = discount_body("John Doe", "whole milk", 20, "March 22, 2015");
        assert!(body.starts_with("Dear John Doe,"));
        assert!(body.contains("20% OFF on whole milk"));
        assert!(body.contains("valid until March 22, 2015"));
        assert!(body.contains("UNSUBSCRIBE"));
    }

    #[test]
    fn voucher_body_carries_the_amount() {
        let body = voucher_body("Jane Doe", 200, "April 14, 2015");
        assert!(body.contains("$200 Shopping Voucher"));
        assert!(body.contains("Valid until April 14, 2015"));
        assert!(body.contains("Your Grocery Store Team"));
    }

    #[test]
    fn recommendation_body_lists_one_bullet_per_product() {
        let products = vec![ItemId("whole milk".to_string()), ItemId("eggs".to_string())];
        let body = recommendation_body("John Doe", &products);
        assert!(body.contains("• whole milk\n• eggs"));
        assert!(body.contains("Based on your shopping history"));
    }
}
