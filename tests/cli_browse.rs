use std::fs;
use std::path::Path;

use predicates::prelude::*;

const CATALOGUE: &str = "\
Lugar,Titulo,Autor,Año,Editorial,Idioma,Tema,Guardado,Notas,Row,Column,Subrow
Salón,Dune,Herbert,1965,,,,R1,,1,,
Salón,Foo,-,,,,,R1 B,,1,,B
Garaje,Ficciones,Borges,1944,,,,\"R2, C1\",,2,1,
Enviado a Remate,Rayuela,Cortázar,1963,,,,,,,,
";

fn workspace(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir.join("sheets"))?;
    fs::write(dir.join("sheets/catalogo.csv"), CATALOGUE)?;
    fs::write(
        dir.join("bookcart.json"),
        r#"{"allowed_users": ["ana@example.com"]}"#,
    )?;
    Ok(())
}

fn session_cmd(dir: &Path, command: &str, email: &str) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookcart");
    cmd.current_dir(dir).args([
        command,
        "--email",
        email,
        "--given-name",
        "Ana",
        "--config",
        "bookcart.json",
        "--store-dir",
        "sheets",
        "--cache-dir",
        "cache",
    ]);
    cmd
}

#[test]
fn browse_adds_rows_and_exports_pick_list() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    workspace(temp.path())?;

    session_cmd(temp.path(), "browse", "ana@example.com")
        .write_stdin("list\nadd 1\nsearch borges\nadd 1\nexport\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 rows"))
        .stdout(predicate::str::contains("Rayuela").not())
        .stdout(predicate::str::contains(
            "1. Dune -- Herbert (1965)\n2. Ficciones -- Borges (1944)\n",
        ));

    let sheet = fs::read_to_string(temp.path().join("sheets/carrito_Ana.csv"))?;
    assert_eq!(sheet.lines().count(), 1);
    let cache = fs::read_to_string(temp.path().join("cache/carrito_Ana.csv"))?;
    assert_eq!(cache.lines().count(), 3);

    session_cmd(temp.path(), "export", "ana@example.com")
        .assert()
        .success()
        .stdout("1. Dune -- Herbert (1965)\n2. Ficciones -- Borges (1944)\n");

    let sheet = fs::read_to_string(temp.path().join("sheets/carrito_Ana.csv"))?;
    assert_eq!(sheet.lines().count(), 3);
    Ok(())
}

#[test]
fn browse_filters_by_location_and_hides_carted_rows() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    workspace(temp.path())?;

    session_cmd(temp.path(), "browse", "ana@example.com")
        .write_stdin("row 1\nsubrow B\nadd 1\nsubrow all\nlist\ncart\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 | Salón | Dune | Herbert"))
        .stdout(predicate::str::contains("1 | Foo | - |  | Salón | 1 |  | B"))
        .stdout(predicate::str::contains("1 in cart"));
    Ok(())
}

#[test]
fn browse_reports_bad_commands_and_keeps_going() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    workspace(temp.path())?;

    session_cmd(temp.path(), "browse", "ana@example.com")
        .write_stdin("frobnicate\nadd 9\nplace Cocina\nempty\nexport\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown command: frobnicate"))
        .stderr(predicate::str::contains("outside the view"))
        .stderr(predicate::str::contains("unknown place"))
        .stdout(predicate::str::contains("cart emptied"));
    Ok(())
}

#[test]
fn unauthorised_user_is_turned_away() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    workspace(temp.path())?;

    session_cmd(temp.path(), "export", "mallory@example.com")
        .assert()
        .failure()
        .stderr(predicate::str::contains("user not authorised"));
    assert!(!temp.path().join("sheets/carrito_Ana.csv").exists());
    Ok(())
}
