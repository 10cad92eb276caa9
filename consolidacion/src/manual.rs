/*!

This is the long-form manual for `consolidacion` and `consolida`.

## Input shape

The input is a published spreadsheet in CSV form: a header row plus one row
per consolidation follow-up entry. All columns are optional; an absent column
silently disables the features that depend on it, it never raises an error.

The recognized columns are:

* `Marca temporal` — the registration timestamp. Values are parsed as
  day/month/year with time of day, then day/month/year without time, then
  with a permissive day-first parse. Rows failing all three are kept, with
  their time-derived fields absent.
* `Nombres y apellidos completos`, `No. de Celular`, `Quién te Invito?` —
  identity columns, carried through untouched.
* `Tú eres:` — the age-group self-description.
* `¿En qué barrio vives?` — the neighborhood; empty values become the
  `No especificado` bucket.
* `Llamada realizada y contestada (SI/NO)`,
  `Ubicado en célula o Grupo Go! (SI/NO)`,
  `Visita realizada (SI/NO)` — the three follow-up flags.

Two logical columns are looked up under several spellings, first match wins:

* leader: `Líder Principal`, `LIDER DE DOCE`, `Lider Principal`,
  `LÍDER PRINCIPAL`
* meeting: `¿A qué reunión viniste?`, `¿A que reunión viniste?`, `Reunión`,
  `REUNION`

## Yes/no values

Flag values are trimmed, uppercased and mapped through two alias tables:
`SI`, `SÍ`, `SÌ`, `YES`, `Y`, `S`, `1`, `TRUE` become `SI`; `NO`, `N`, `0`,
`FALSE`, `SIN GESTIÓN`, `SIN GESTION` become `NO`. Anything else passes
through unchanged (uppercased) so that unexpected free text stays visible in
the output instead of being silently coerced.

## Filters

Filters compose with AND. The year and month filters keep records without a
parseable timestamp; a month range with start > end wraps across the year
boundary. The age-group, leader and meeting filters are plain equality tests.

*/
