// src/services/sla.rs

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::common::dates;

// O SLA do fornecedor conta em dias corridos a partir do dia-calendário
// (no fuso do tenant) em que a peça foi entregue.

pub fn compute_due_date(delivered_at: DateTime<Utc>, sla_days: i32, tz: Tz) -> NaiveDate {
    dates::add_days(dates::local_date(delivered_at, tz), i64::from(sla_days))
}

/// Vencido é estritamente antes de hoje: no próprio dia do vencimento o
/// chamado ainda não está atrasado.
pub fn is_overdue(due_date: NaiveDate, today: NaiveDate) -> bool {
    due_date < today
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sao_paulo() -> Tz {
        "America/Sao_Paulo".parse().unwrap()
    }

    #[test]
    fn prazo_soma_dias_corridos_sobre_o_dia_local() {
        let entregue = Utc.with_ymd_and_hms(2025, 4, 10, 18, 0, 0).unwrap();
        let prazo = compute_due_date(entregue, 10, sao_paulo());
        assert_eq!(prazo, NaiveDate::from_ymd_opt(2025, 4, 20).unwrap());
    }

    #[test]
    fn prazo_e_deterministico_e_fecha_a_conta_de_dias() {
        let entregue = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();
        for n in [0, 1, 5, 30, 90] {
            let prazo = compute_due_date(entregue, n, sao_paulo());
            assert_eq!(prazo, compute_due_date(entregue, n, sao_paulo()));
            let base = dates::local_date(entregue, sao_paulo());
            assert_eq!(dates::diff_days(base, prazo), i64::from(n));
        }
    }

    #[test]
    fn entrega_de_madrugada_utc_cai_no_dia_anterior_local() {
        // 02:00 UTC = 23:00 do dia anterior em São Paulo
        let entregue = Utc.with_ymd_and_hms(2025, 4, 10, 2, 0, 0).unwrap();
        let prazo = compute_due_date(entregue, 1, sao_paulo());
        assert_eq!(prazo, NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
    }

    #[test]
    fn no_dia_do_vencimento_ainda_nao_esta_atrasado() {
        let vencimento = NaiveDate::from_ymd_opt(2025, 4, 20).unwrap();
        assert!(!is_overdue(vencimento, vencimento));
        assert!(is_overdue(vencimento, vencimento.succ_opt().unwrap()));
        assert!(!is_overdue(vencimento, vencimento.pred_opt().unwrap()));
    }
}
