// src/common/dates.rs

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

// Datas de negócio (vencimento, próxima ação) são sempre date-only,
// resolvidas no fuso do tenant. Comparar NaiveDate equivale à comparação
// lexicográfica de strings YYYY-MM-DD usada pelo front.

/// Dia corrente no fuso informado.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Trunca um timestamp UTC para o dia-calendário no fuso informado.
pub fn local_date(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

/// Soma de dias corridos (não úteis).
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Diferença em dias corridos entre duas datas (`b - a`).
pub fn diff_days(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}
