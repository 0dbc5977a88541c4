//! End-to-end tests of the daily FWI pipeline against in-memory storage.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use fwi::{DailyFwiProcessor, IndexFormulas, StageOutcome, VanWagnerFormulas};
use raster::{RasterHandle, NO_DATA_SENTINEL};
use sfms_common::{FwiParameter, RunType};
use storage::{ObjectStorage, RasterKeyAddresser};
use test_utils::{put_raster, uniform_raster};

const WIDTH: usize = 4;
const HEIGHT: usize = 4;

fn start() -> DateTime<Utc> {
    // 13z: the 12z model run is the most recent.
    Utc.with_ymd_and_hms(2024, 8, 2, 13, 0, 0).unwrap()
}

fn target_for(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 2, 20, 0, 0).unwrap() + Duration::days(day)
}

/// Upload yesterday's ground-truth index rasters.
async fn seed_predecessors(storage: &ObjectStorage, addresser: &RasterKeyAddresser) {
    let previous = target_for(-1);
    for (param, value) in [
        (FwiParameter::Dc, 200.0),
        (FwiParameter::Dmc, 30.0),
        (FwiParameter::Ffmc, 85.0),
    ] {
        let key = addresser.uploaded_index_key(previous, param);
        put_raster(storage, &key, &uniform_raster(WIDTH, HEIGHT, value))
            .await
            .unwrap();
    }
}

/// Upload one day's interpolated weather surfaces.
async fn seed_actual_weather(
    storage: &ObjectStorage,
    addresser: &RasterKeyAddresser,
    day: i64,
    temp: f32,
) {
    seed_actual_weather_rasters(
        storage,
        addresser,
        day,
        uniform_raster(WIDTH, HEIGHT, temp),
        uniform_raster(WIDTH, HEIGHT, 50.0),
    )
    .await;
}

async fn seed_actual_weather_rasters(
    storage: &ObjectStorage,
    addresser: &RasterKeyAddresser,
    day: i64,
    temp: RasterHandle,
    rh: RasterHandle,
) {
    let keys = addresser.interpolated_weather_keys(target_for(day));
    put_raster(storage, &keys.temp, &temp).await.unwrap();
    put_raster(storage, &keys.rh, &rh).await.unwrap();
    put_raster(
        storage,
        &keys.wind_speed,
        &uniform_raster(WIDTH, HEIGHT, 10.0),
    )
    .await
    .unwrap();
    put_raster(storage, &keys.precip, &uniform_raster(WIDTH, HEIGHT, 0.0))
        .await
        .unwrap();
}

fn actual_processor(days: u32) -> DailyFwiProcessor {
    DailyFwiProcessor::new(
        start(),
        days,
        RunType::Actual,
        RasterKeyAddresser::new(),
        Arc::new(VanWagnerFormulas),
    )
}

async fn calculated(storage: &ObjectStorage, day: i64, param: FwiParameter) -> RasterHandle {
    let key = RasterKeyAddresser::new().calculated_index_key(
        target_for(day),
        param,
        RunType::Actual,
    );
    let bytes = storage.get(&key).await.unwrap();
    RasterHandle::from_bytes(&bytes).unwrap()
}

#[tokio::test]
async fn test_single_day_produces_all_six_indices() {
    let storage = ObjectStorage::in_memory();
    let addresser = RasterKeyAddresser::new();
    seed_predecessors(&storage, &addresser).await;
    seed_actual_weather(&storage, &addresser, 0, 20.0).await;

    let reports = actual_processor(1).process(&storage).await.unwrap();
    assert_eq!(reports.len(), 6);
    assert!(reports
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::Persisted { .. })));

    // Stage order within the day is the topological order.
    let order: Vec<FwiParameter> = reports.iter().map(|r| r.param).collect();
    assert_eq!(
        order,
        vec![
            FwiParameter::Dc,
            FwiParameter::Dmc,
            FwiParameter::Ffmc,
            FwiParameter::Bui,
            FwiParameter::Isi,
            FwiParameter::Fwi,
        ]
    );

    // Uniform inputs produce uniform outputs matching the equations
    // (every cell is north of the 30 degree day-length band edge).
    let formulas = VanWagnerFormulas;
    let expected_dc = formulas.dc(200.0, 20.0, 0.0, 54.0, 8);
    let expected_dmc = formulas.dmc(30.0, 20.0, 50.0, 0.0, 54.0, 8);
    let expected_ffmc = formulas.ffmc(85.0, 20.0, 50.0, 10.0, 0.0);
    let expected_bui = formulas.bui(expected_dmc, expected_dc);
    let expected_isi = formulas.isi(expected_ffmc, 10.0);
    let expected_fwi = formulas.fwi(expected_isi, expected_bui);

    for (param, expected) in [
        (FwiParameter::Dc, expected_dc),
        (FwiParameter::Dmc, expected_dmc),
        (FwiParameter::Ffmc, expected_ffmc),
        (FwiParameter::Bui, expected_bui),
        (FwiParameter::Isi, expected_isi),
        (FwiParameter::Fwi, expected_fwi),
    ] {
        let raster = calculated(&storage, 0, param).await;
        for &v in raster.data() {
            assert!(
                (f64::from(v) - expected).abs() < 1e-3,
                "{}: {} vs {}",
                param,
                v,
                expected
            );
        }
    }
}

#[tokio::test]
async fn test_rerun_is_noop() {
    let storage = ObjectStorage::in_memory();
    let addresser = RasterKeyAddresser::new();
    seed_predecessors(&storage, &addresser).await;
    seed_actual_weather(&storage, &addresser, 0, 20.0).await;

    let first = actual_processor(1).process(&storage).await.unwrap();
    assert!(first
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::Persisted { .. })));

    let second = actual_processor(1).process(&storage).await.unwrap();
    assert_eq!(second.len(), 6);
    assert!(second
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::AlreadyDone)));
}

#[tokio::test]
async fn test_forced_recompute_reproduces_identical_bytes() {
    let storage = ObjectStorage::in_memory();
    let addresser = RasterKeyAddresser::new();
    seed_predecessors(&storage, &addresser).await;
    seed_actual_weather(&storage, &addresser, 0, 20.0).await;

    actual_processor(1).process(&storage).await.unwrap();
    let key = addresser.calculated_index_key(target_for(0), FwiParameter::Fwi, RunType::Actual);
    let first_bytes = storage.get(&key).await.unwrap();

    // Force recomputation of the last stage with unchanged inputs.
    storage.delete(&key).await.unwrap();
    actual_processor(1).process(&storage).await.unwrap();
    let second_bytes = storage.get(&key).await.unwrap();
    assert_eq!(first_bytes, second_bytes);
}

#[tokio::test]
async fn test_missing_weather_skips_without_writing() {
    let storage = ObjectStorage::in_memory();
    let addresser = RasterKeyAddresser::new();
    seed_predecessors(&storage, &addresser).await;
    // No weather uploaded at all.

    let reports = actual_processor(1).process(&storage).await.unwrap();
    assert_eq!(reports.len(), 6);
    assert!(reports
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::Skipped { .. })));
    assert!(storage.list("sfms/calculated").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_predecessor_skips() {
    let storage = ObjectStorage::in_memory();
    let addresser = RasterKeyAddresser::new();
    // Weather present, no predecessor rasters anywhere.
    seed_actual_weather(&storage, &addresser, 0, 20.0).await;

    let reports = actual_processor(1).process(&storage).await.unwrap();
    assert!(reports
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::Skipped { .. })));
}

#[tokio::test]
async fn test_three_day_run_feeds_forward_in_order() {
    let storage = ObjectStorage::in_memory();
    let addresser = RasterKeyAddresser::new();
    seed_predecessors(&storage, &addresser).await;
    for day in 0..3 {
        seed_actual_weather(&storage, &addresser, day, 20.0).await;
    }

    let reports = actual_processor(3).process(&storage).await.unwrap();
    assert_eq!(reports.len(), 18);
    assert!(reports
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::Persisted { .. })));

    // Dry days: the drought codes must strictly accumulate, proving each
    // day consumed the previous day's calculated output rather than the
    // original upload.
    let dc0 = calculated(&storage, 0, FwiParameter::Dc).await.data()[0];
    let dc1 = calculated(&storage, 1, FwiParameter::Dc).await.data()[0];
    let dc2 = calculated(&storage, 2, FwiParameter::Dc).await.data()[0];
    assert!(dc0 < dc1 && dc1 < dc2, "{} {} {}", dc0, dc1, dc2);

    // Build-up for each day reflects that day's codes, not a later one.
    let formulas = VanWagnerFormulas;
    for day in 0..3 {
        let dmc = calculated(&storage, day, FwiParameter::Dmc).await.data()[0];
        let dc = calculated(&storage, day, FwiParameter::Dc).await.data()[0];
        let bui = calculated(&storage, day, FwiParameter::Bui).await.data()[0];
        let expected = formulas.bui(f64::from(dmc), f64::from(dc));
        assert!((f64::from(bui) - expected).abs() < 1e-3);
    }
}

#[tokio::test]
async fn test_run_stops_at_first_unavailable_date() {
    let storage = ObjectStorage::in_memory();
    let addresser = RasterKeyAddresser::new();
    seed_predecessors(&storage, &addresser).await;
    // Only day 0 has weather; days 1 and 2 do not.
    seed_actual_weather(&storage, &addresser, 0, 20.0).await;

    let reports = actual_processor(3).process(&storage).await.unwrap();
    // Six persisted for day 0, six skipped for day 1, nothing for day 2.
    assert_eq!(reports.len(), 12);
    assert!(reports[..6]
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::Persisted { .. })));
    assert!(reports[6..]
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::Skipped { .. })));

    let day1_key =
        addresser.calculated_index_key(target_for(1), FwiParameter::Dc, RunType::Actual);
    assert!(!storage.exists(&day1_key).await.unwrap());
}

#[tokio::test]
async fn test_nodata_weather_propagates_to_every_index() {
    let storage = ObjectStorage::in_memory();
    let addresser = RasterKeyAddresser::new();
    seed_predecessors(&storage, &addresser).await;

    let mut temp_values = vec![20.0f32; WIDTH * HEIGHT];
    temp_values[5] = NO_DATA_SENTINEL;
    seed_actual_weather_rasters(
        &storage,
        &addresser,
        0,
        test_utils::raster_with(temp_values, WIDTH, HEIGHT),
        uniform_raster(WIDTH, HEIGHT, 50.0),
    )
    .await;

    actual_processor(1).process(&storage).await.unwrap();

    for param in [
        FwiParameter::Dc,
        FwiParameter::Dmc,
        FwiParameter::Ffmc,
        FwiParameter::Bui,
        FwiParameter::Isi,
        FwiParameter::Fwi,
    ] {
        let raster = calculated(&storage, 0, param).await;
        assert_eq!(
            raster.data()[5],
            NO_DATA_SENTINEL,
            "{} must be no-data where temperature was no-data",
            param
        );
        assert_ne!(raster.data()[0], NO_DATA_SENTINEL);
    }
}

#[tokio::test]
async fn test_overshooting_humidity_is_clamped_during_warp() {
    // 105% humidity input must behave exactly like 100%.
    let run = |rh_value: f32| async move {
        let storage = ObjectStorage::in_memory();
        let addresser = RasterKeyAddresser::new();
        seed_predecessors(&storage, &addresser).await;
        seed_actual_weather_rasters(
            &storage,
            &addresser,
            0,
            uniform_raster(WIDTH, HEIGHT, 20.0),
            uniform_raster(WIDTH, HEIGHT, rh_value),
        )
        .await;
        actual_processor(1).process(&storage).await.unwrap();
        calculated(&storage, 0, FwiParameter::Ffmc).await.data()[0]
    };

    assert_eq!(run(105.0).await, run(100.0).await);
}

#[tokio::test]
async fn test_forecast_outputs_get_web_companions() {
    let storage = ObjectStorage::in_memory();
    let addresser = RasterKeyAddresser::new();
    seed_predecessors(&storage, &addresser).await;

    // Model weather at the keys the forecast run resolves.
    let keys = addresser.weather_data_keys(start(), target_for(0), 8);
    put_raster(&storage, &keys.temp, &uniform_raster(WIDTH, HEIGHT, 20.0))
        .await
        .unwrap();
    put_raster(&storage, &keys.rh, &uniform_raster(WIDTH, HEIGHT, 50.0))
        .await
        .unwrap();
    put_raster(
        &storage,
        &keys.wind_speed,
        &uniform_raster(WIDTH, HEIGHT, 10.0),
    )
    .await
    .unwrap();
    put_raster(&storage, &keys.precip, &uniform_raster(WIDTH, HEIGHT, 0.0))
        .await
        .unwrap();

    let processor = DailyFwiProcessor::new(
        start(),
        1,
        RunType::Forecast,
        RasterKeyAddresser::new(),
        Arc::new(VanWagnerFormulas),
    );
    let reports = processor.process(&storage).await.unwrap();
    assert!(reports
        .iter()
        .all(|r| matches!(r.outcome, StageOutcome::Persisted { .. })));

    for param in [FwiParameter::Dc, FwiParameter::Fwi] {
        let key = addresser.calculated_index_key(target_for(0), param, RunType::Forecast);
        let companion = addresser.companion_key(&key).unwrap();
        assert!(storage.exists(&companion).await.unwrap(), "{}", companion);
    }

    // Forecast and actual outputs never share keys.
    let actual_key =
        addresser.calculated_index_key(target_for(0), FwiParameter::Dc, RunType::Actual);
    assert!(!storage.exists(&actual_key).await.unwrap());
}
