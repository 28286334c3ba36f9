//! Display helpers
//!
//! Sensor báo current theo mA, power theo mW. Dưới 1 đơn vị → hiển thị micro.

pub fn format_power(power_mw: f64) -> String {
    if power_mw < 1.0 {
        format!("{:.1} µW", power_mw * 1000.0)
    } else {
        format!("{:.2} mW", power_mw)
    }
}

pub fn format_current(current_ma: f64) -> String {
    if current_ma < 1.0 {
        format!("{:.1} µA", current_ma * 1000.0)
    } else {
        format!("{:.2} mA", current_ma)
    }
}

pub fn format_voltage(voltage: f64) -> String {
    format!("{:.2} V", voltage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_switch() {
        assert_eq!(format_power(0.016), "16.0 µW");
        assert_eq!(format_power(250.0), "250.00 mW");
        assert_eq!(format_current(0.02), "20.0 µA");
        assert_eq!(format_current(1.0), "1.00 mA");
        assert_eq!(format_voltage(0.8), "0.80 V");
    }
}
