#![no_main]
use libfuzzer_sys::fuzz_target;
use stay_booking::adapters::rest_store::rows;

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = std::str::from_utf8(data) {
        let _ = rows::parse_unit_rows(body, &["pikulas".to_string()]);
        let _ = rows::parse_reservation_rows(body, "gintaras");
        let _ = rows::parse_coupon_rows(body);
        let _ = rows::name_slug(body);
    }
});
