// SORTSWEEP -- PARALLEL SORT BENCHMARK HARNESS
// DRIVES EXTERNAL SORT EXECUTABLES ACROSS ARRAY SIZE x PARALLELISM DEGREE,
// EXTRACTS TIMINGS FROM THEIR OUTPUT, AGGREGATES TRIALS, DERIVES SPEEDUP /
// EFFICIENCY / COMMUNICATION OVERHEAD, AND ASSEMBLES REPORTS.
//
// DATA FLOWS ONE WAY:
//   runner -> extract -> trial -> sweep -> metrics -> report -> output

pub mod availability;
pub mod config;
pub mod extract;
pub mod metrics;
pub mod output;
pub mod report;
pub mod runner;
pub mod stats;
pub mod sweep;
pub mod table;
pub mod trial;
pub mod variant;
