pub mod vacation_renewal;
