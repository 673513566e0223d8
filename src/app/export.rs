use crate::domain::model::{Doctor, Service};
use crate::utils::error::{ClinicError, Result};
use std::io::Write;

/// 價格表輸出為 CSV（類別、名稱、價格、代碼）
pub fn write_services_csv<W: Write>(services: &[Service], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["category", "name", "price", "price_code"])?;
    for service in services {
        let price = format!("{:.2}", service.price);
        csv.write_record([
            service.category.as_str(),
            service.name.as_str(),
            price.as_str(),
            service.price_code.as_str(),
        ])?;
    }
    csv.flush().map_err(ClinicError::IoError)
}

pub fn write_doctors_csv<W: Write>(doctors: &[Doctor], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "name",
        "specialty",
        "experience",
        "schedule",
        "education",
        "certificates",
        "photo_url",
    ])?;
    for doctor in doctors {
        let certificates = doctor.certificates.join("; ");
        csv.write_record([
            doctor.name.as_str(),
            doctor.specialty.as_str(),
            doctor.experience.as_str(),
            doctor.schedule.as_str(),
            doctor.education.as_str(),
            certificates.as_str(),
            doctor.photo_url.as_str(),
        ])?;
    }
    csv.flush().map_err(ClinicError::IoError)
}
