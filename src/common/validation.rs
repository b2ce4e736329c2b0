// src/common/validation.rs
//
// Validadores customizados usados nos payloads (validator::Validate).

use rust_decimal::Decimal;
use validator::ValidationError;

/// Maior valor que cabe em NUMERIC(12,2): 9.999.999.999,99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Verdadeiro se o valor cabe numa coluna NUMERIC(12,2) sem ser arredondado.
pub fn fits_money(val: Decimal) -> bool {
    val.normalize().scale() <= 2 && val.abs() <= MAX_AMOUNT
}

/// Valor monetário não negativo com até duas casas decimais.
pub fn money(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    money_bounds(val)
}

pub fn positive_amount(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    money_bounds(val)
}

fn money_bounds(val: &Decimal) -> Result<(), ValidationError> {
    if val.normalize().scale() > 2 {
        let mut err = ValidationError::new("scale");
        err.add_param("max".into(), &2);
        err.message = Some("O valor aceita no máximo duas casas decimais.".into());
        return Err(err);
    }
    if *val > MAX_AMOUNT {
        let mut err = ValidationError::new("range");
        err.add_param("max".into(), &MAX_AMOUNT.to_string());
        err.message = Some("O valor excede o limite permitido.".into());
        return Err(err);
    }
    Ok(())
}

pub fn not_negative(val: i32) -> Result<(), ValidationError> {
    if val < 0 {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_zero_and_negative_amounts() {
        assert!(positive_amount(&dec!(0.01)).is_ok());
        assert!(positive_amount(&dec!(0)).is_err());
        assert!(positive_amount(&dec!(-5)).is_err());
    }

    #[test]
    fn amounts_keep_two_decimal_places() {
        assert!(positive_amount(&dec!(0.005)).is_err());
        assert!(positive_amount(&dec!(10.500)).is_ok());
        assert!(money(&dec!(19.999)).is_err());
        assert!(money(&dec!(0)).is_ok());
    }

    #[test]
    fn amounts_fit_the_money_column() {
        assert_eq!(MAX_AMOUNT, dec!(9999999999.99));
        assert!(positive_amount(&MAX_AMOUNT).is_ok());
        assert!(positive_amount(&dec!(10000000000)).is_err());
        assert!(positive_amount(&Decimal::MAX).is_err());
        assert!(!fits_money(Decimal::MAX));
        assert!(fits_money(dec!(-40.00)));
    }

    #[test]
    fn accepts_zero_counts() {
        assert!(not_negative(0).is_ok());
        assert!(not_negative(-1).is_err());
    }
}
