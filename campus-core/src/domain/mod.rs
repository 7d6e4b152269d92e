mod building;
mod campus;
mod reading;

pub use building::Building;
pub use campus::Campus;
pub use reading::Reading;
