use tokio_postgres::GenericClient;

use crate::error::Result;
use crate::models::flight::FlightRecord;

/// Resolves the airline by name, inserting it if absent.
///
/// A single upsert-and-return statement keeps get-or-create atomic under
/// concurrent sessions targeting the same natural key; the no-op `DO UPDATE`
/// makes `RETURNING id` yield the existing row's id on conflict.
pub async fn resolve_airline<C: GenericClient>(client: &C, name: &str) -> Result<i32> {
    let row = client
        .query_one(
            r#"
            INSERT INTO airlines (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
            &[&name],
        )
        .await?;
    Ok(row.try_get("id")?)
}

/// Resolves the aircraft by model, inserting it if absent.
pub async fn resolve_aircraft<C: GenericClient>(client: &C, model: &str) -> Result<i32> {
    let row = client
        .query_one(
            r#"
            INSERT INTO aircrafts (model)
            VALUES ($1)
            ON CONFLICT (model) DO UPDATE SET model = EXCLUDED.model
            RETURNING id
            "#,
            &[&model],
        )
        .await?;
    Ok(row.try_get("id")?)
}

/// Records an airport code/city pair.
///
/// First-seen city wins: a known code keeps its stored city and conflicting
/// city data is silently ignored, not merged or flagged.
pub async fn ensure_airport<C: GenericClient>(client: &C, code: &str, city: &str) -> Result<()> {
    client
        .execute(
            r#"
            INSERT INTO airports (code, city)
            VALUES ($1, $2)
            ON CONFLICT (code) DO NOTHING
            "#,
            &[&code, &city],
        )
        .await?;
    Ok(())
}

/// Resolves the passenger by passport number, inserting them if absent.
pub async fn resolve_passenger<C: GenericClient>(
    client: &C,
    passport_no: &str,
    full_name: &str,
) -> Result<i32> {
    let row = client
        .query_one(
            r#"
            INSERT INTO passengers (passport_no, full_name)
            VALUES ($1, $2)
            ON CONFLICT (passport_no) DO UPDATE SET passport_no = EXCLUDED.passport_no
            RETURNING id
            "#,
            &[&passport_no, &full_name],
        )
        .await?;
    Ok(row.try_get("id")?)
}

/// Normalizes one flight record inside the caller's transaction.
///
/// Fixed order: airline, aircraft, both airports, passenger, then the fact
/// row. The fact is append-only; repeated identical streams produce repeated
/// facts. Any failure propagates so the caller rolls back the whole stream.
pub async fn normalize<C: GenericClient>(client: &C, record: &FlightRecord) -> Result<()> {
    let airline_id = resolve_airline(client, &record.airline_name).await?;
    let aircraft_id = resolve_aircraft(client, &record.aircraft_model).await?;

    ensure_airport(client, &record.dep_code, &record.dep_city).await?;
    ensure_airport(client, &record.arr_code, &record.arr_city).await?;

    let passenger_id = resolve_passenger(client, &record.passport_no, &record.passenger_name).await?;

    let departure = record.departure_timestamp()?;
    client
        .execute(
            r#"
            INSERT INTO flights
                (flight_no, date, airline_id, aircraft_id, dep_airport_code, arr_airport_code, passenger_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            &[
                &record.flight_no,
                &departure,
                &airline_id,
                &aircraft_id,
                &record.dep_code,
                &record.arr_code,
                &passenger_id,
            ],
        )
        .await?;
    Ok(())
}
