//! Input form served on `GET /`. Submits the fields as JSON to `POST /`.

pub(super) const CUSTOMER_FORM: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Customer Segmentation</title>
  <style>
    body { font-family: sans-serif; max-width: 720px; margin: 2rem auto; }
    form { display: grid; grid-template-columns: 1fr 1fr; gap: 0.5rem 1rem; }
    label { display: flex; flex-direction: column; font-size: 0.9rem; }
    button { grid-column: span 2; padding: 0.6rem; }
    #result { margin-top: 1rem; font-weight: bold; }
  </style>
</head>
<body>
  <h1>Customer Segmentation</h1>
  <form id="customer-form">
    <label>Age <input name="Age" type="number" step="1" required></label>
    <label>Education <input name="Education" type="number" step="1" required></label>
    <label>Marital_Status <input name="Marital_Status" type="number" step="1" required></label>
    <label>Parental_Status <input name="Parental_Status" type="number" step="1" required></label>
    <label>Children <input name="Children" type="number" step="1" required></label>
    <label>Income <input name="Income" type="number" step="any" required></label>
    <label>Total_Spending <input name="Total_Spending" type="number" step="any" required></label>
    <label>Days_as_Customer <input name="Days_as_Customer" type="number" step="1" required></label>
    <label>Recency <input name="Recency" type="number" step="1" required></label>
    <label>Wines <input name="Wines" type="number" step="1" required></label>
    <label>Fruits <input name="Fruits" type="number" step="1" required></label>
    <label>Meat <input name="Meat" type="number" step="1" required></label>
    <label>Fish <input name="Fish" type="number" step="1" required></label>
    <label>Sweets <input name="Sweets" type="number" step="1" required></label>
    <label>Gold <input name="Gold" type="number" step="1" required></label>
    <label>Web <input name="Web" type="number" step="1" required></label>
    <label>Catalog <input name="Catalog" type="number" step="1" required></label>
    <label>Store <input name="Store" type="number" step="1" required></label>
    <label>Discount_Purchases <input name="Discount_Purchases" type="number" step="1" required></label>
    <label>Total_Promo <input name="Total_Promo" type="number" step="1" required></label>
    <label>NumWebVisitsMonth <input name="NumWebVisitsMonth" type="number" step="1" required></label>
    <button type="submit">Predict cluster</button>
  </form>
  <div id="result"></div>
  <script>
    document.getElementById("customer-form").addEventListener("submit", async (event) => {
      event.preventDefault();
      const payload = {};
      for (const input of event.target.querySelectorAll("input")) {
        payload[input.name] = Number(input.value);
      }
      const response = await fetch("/", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify(payload),
      });
      const body = await response.json();
      document.getElementById("result").textContent = response.ok
        ? "Predicted cluster: " + body.predicted_cluster
        : "Error: " + body.error;
    });
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CustomerData;

    #[test]
    fn test_form_has_every_field() {
        for column in CustomerData::COLUMNS {
            assert!(
                CUSTOMER_FORM.contains(&format!("name=\"{column}\"")),
                "missing input for {column}"
            );
        }
    }
}
