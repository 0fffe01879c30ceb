pub mod job_statistics;
